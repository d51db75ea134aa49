use std::fmt;

use crate::expr::ValueType;
use crate::id::{AttrId, ExprId, NodeId};
use crate::math::Axis;

/// Local channel of a transform node that can be read or driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Translate,
    Rotate,
    Scale,
    TranslateAxis(Axis),
    ScaleAxis(Axis),
}

/// Channels that evaluate together. A per-axis driver overrides one
/// component of the whole-vector channel of the same group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelGroup {
    Translate,
    Rotate,
    Scale,
}

impl Channel {
    pub fn value_type(self) -> ValueType {
        match self {
            Channel::Translate | Channel::Scale => ValueType::Vec3,
            Channel::Rotate => ValueType::Quat,
            Channel::TranslateAxis(_) | Channel::ScaleAxis(_) => ValueType::Float,
        }
    }

    pub fn group(self) -> ChannelGroup {
        match self {
            Channel::Translate | Channel::TranslateAxis(_) => ChannelGroup::Translate,
            Channel::Rotate => ChannelGroup::Rotate,
            Channel::Scale | Channel::ScaleAxis(_) => ChannelGroup::Scale,
        }
    }
}

impl ChannelGroup {
    pub fn members(self) -> &'static [Channel] {
        match self {
            ChannelGroup::Translate => &[
                Channel::Translate,
                Channel::TranslateAxis(Axis::X),
                Channel::TranslateAxis(Axis::Y),
                Channel::TranslateAxis(Axis::Z),
            ],
            ChannelGroup::Rotate => &[Channel::Rotate],
            ChannelGroup::Scale => &[
                Channel::Scale,
                Channel::ScaleAxis(Axis::X),
                Channel::ScaleAxis(Axis::Y),
                Channel::ScaleAxis(Axis::Z),
            ],
        }
    }
}

/// A typed attribute endpoint.
///
/// `Attr` and `Channel` plugs are writable and accept at most one incoming
/// connection. Every other variant is computed and read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plug {
    Output { node: ExprId, index: u8 },
    Attr(AttrId),
    Channel(NodeId, Channel),
    WorldMatrix(NodeId),
    WorldInverse(NodeId),
    ParentMatrix(NodeId),
    ParentInverse(NodeId),
    WorldPosition(NodeId),
}

impl Plug {
    pub fn output(node: ExprId) -> Self {
        Plug::Output { node, index: 0 }
    }

    pub fn translate(node: NodeId) -> Self {
        Plug::Channel(node, Channel::Translate)
    }

    pub fn rotate(node: NodeId) -> Self {
        Plug::Channel(node, Channel::Rotate)
    }

    pub fn scale(node: NodeId) -> Self {
        Plug::Channel(node, Channel::Scale)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Plug::Attr(_) | Plug::Channel(..))
    }
}

impl fmt::Display for Plug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plug::Output { node, index } => write!(f, "{node}.out[{index}]"),
            Plug::Attr(attr) => write!(f, "{attr}"),
            Plug::Channel(node, channel) => write!(f, "{node}.{channel:?}"),
            Plug::WorldMatrix(node) => write!(f, "{node}.worldMatrix"),
            Plug::WorldInverse(node) => write!(f, "{node}.worldInverseMatrix"),
            Plug::ParentMatrix(node) => write!(f, "{node}.parentMatrix"),
            Plug::ParentInverse(node) => write!(f, "{node}.parentInverseMatrix"),
            Plug::WorldPosition(node) => write!(f, "{node}.worldPosition"),
        }
    }
}
