use std::collections::HashSet;

use super::plug::{ChannelGroup, Plug};
use super::Scene;
use crate::expr::Input;
use crate::id::{AttrId, ExprId, NodeId};

/// Unit of evaluation used for cycle detection.
///
/// `Position` is kept apart from `World` because a node's world position
/// only depends on its parent and its translate channel. An aim constraint
/// may therefore read the position of the joint whose rotation it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DepKey {
    Expr(ExprId),
    Attr(AttrId),
    Channel(NodeId, ChannelGroup),
    World(NodeId),
    Position(NodeId),
}

impl Scene {
    fn dep_key(&self, plug: Plug) -> Option<DepKey> {
        match plug {
            Plug::Output { node, .. } => Some(DepKey::Expr(node)),
            Plug::Attr(id) => Some(DepKey::Attr(id)),
            Plug::Channel(node, channel) => Some(DepKey::Channel(node, channel.group())),
            Plug::WorldMatrix(node) | Plug::WorldInverse(node) => Some(DepKey::World(node)),
            Plug::ParentMatrix(node) | Plug::ParentInverse(node) => {
                self.parent(node).map(DepKey::World)
            }
            Plug::WorldPosition(node) => Some(DepKey::Position(node)),
        }
    }

    fn upstream(&self, key: DepKey) -> Vec<DepKey> {
        match key {
            DepKey::Expr(id) => self
                .expressions
                .node(id)
                .map(|node| {
                    node.inputs
                        .iter()
                        .filter_map(Input::plug)
                        .filter_map(|plug| self.dep_key(plug))
                        .collect()
                })
                .unwrap_or_default(),
            DepKey::Attr(id) => self
                .driver(Plug::Attr(id))
                .and_then(|plug| self.dep_key(plug))
                .into_iter()
                .collect(),
            DepKey::Channel(node, group) => group
                .members()
                .iter()
                .filter_map(|channel| self.driver(Plug::Channel(node, *channel)))
                .filter_map(|plug| self.dep_key(plug))
                .collect(),
            DepKey::World(node) => {
                let mut keys = vec![
                    DepKey::Channel(node, ChannelGroup::Translate),
                    DepKey::Channel(node, ChannelGroup::Rotate),
                    DepKey::Channel(node, ChannelGroup::Scale),
                ];
                keys.extend(self.parent(node).map(DepKey::World));
                keys
            }
            DepKey::Position(node) => {
                let mut keys = vec![DepKey::Channel(node, ChannelGroup::Translate)];
                keys.extend(self.parent(node).map(DepKey::World));
                keys
            }
        }
    }

    fn reaches(&self, start: Option<DepKey>, hit: impl Fn(DepKey) -> bool) -> bool {
        let mut stack: Vec<DepKey> = start.into_iter().collect();
        let mut visited = HashSet::new();
        while let Some(key) = stack.pop() {
            if hit(key) {
                return true;
            }
            if visited.insert(key) {
                stack.extend(self.upstream(key));
            }
        }
        false
    }

    /// True when `dst` already feeds `src`, so `src -> dst` would close a loop.
    pub(crate) fn connection_creates_cycle(&self, src: Plug, dst: Plug) -> bool {
        let Some(target) = self.dep_key(dst) else {
            return false;
        };
        self.reaches(self.dep_key(src), |key| key == target)
    }

    /// True when the world matrix of `parent` depends on anything inside the
    /// subtree of `child`.
    pub(crate) fn reparent_creates_cycle(&self, child: NodeId, parent: NodeId) -> bool {
        let subtree: HashSet<NodeId> = self.transforms.subtree(child).into_iter().collect();
        if subtree.contains(&parent) {
            return true;
        }
        self.reaches(Some(DepKey::World(parent)), |key| match key {
            DepKey::World(node) | DepKey::Position(node) => subtree.contains(&node),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::math::Axis;
    use crate::scene::{Channel, Plug, Scene};

    #[test]
    fn feedback_through_expressions_is_rejected() {
        let mut scene = Scene::new();
        let node = scene.create_transform("node", None).unwrap();
        let tx = Plug::Channel(node, Channel::TranslateAxis(Axis::X));
        let doubled = scene.multiply(Plug::WorldPosition(node), 2.0).unwrap();
        let x = scene.component(doubled, Axis::X).unwrap();

        let err = scene.connect(x, tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicConnection);
    }

    #[test]
    fn rotation_may_read_own_position() {
        let mut scene = Scene::new();
        let root = scene.create_transform("root", None).unwrap();
        let target = scene.create_transform("target", None).unwrap();
        let rotation = scene
            .aim_rotation(
                Plug::WorldPosition(root),
                Plug::WorldPosition(target),
                glam::Vec3::Y,
                Plug::ParentMatrix(root),
                glam::Vec3::X,
                glam::Vec3::Y,
            )
            .unwrap();
        scene.connect(rotation, Plug::rotate(root)).unwrap();
    }

    #[test]
    fn reparenting_under_a_dependent_fails() {
        let mut scene = Scene::new();
        let driver = scene.create_transform("driver", None).unwrap();
        let follower = scene.create_transform("follower", None).unwrap();
        scene
            .connect(Plug::WorldPosition(driver), Plug::translate(follower))
            .unwrap();

        let err = scene.set_parent(driver, Some(follower), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicConnection);
    }
}
