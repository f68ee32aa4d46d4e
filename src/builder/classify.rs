use crate::model::{Attachment, CollisionShape, EventObject, NodeKind};

const EVENT_PREFIXES: [&str; 4] = ["SND", "UBR", "FTP", "SPL"];

/// Role of an empty marker object, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Event,
    CollisionShape,
    Attachment,
    Helper,
}

impl NodeClass {
    /// `SND`/`UBR`/`FTP`/`SPL` prefixes are events, a `Collision` prefix is
    /// a collision shape, a ` Ref` suffix is an attachment and a `Bone_`
    /// prefix is a helper. Anything else is not exported.
    pub fn from_name(name: &str) -> Option<Self> {
        if EVENT_PREFIXES.iter().any(|p| name.starts_with(p)) {
            Some(NodeClass::Event)
        } else if name.starts_with("Collision") {
            Some(NodeClass::CollisionShape)
        } else if name.ends_with(" Ref") {
            Some(NodeClass::Attachment)
        } else if name.starts_with("Bone_") {
            Some(NodeClass::Helper)
        } else {
            None
        }
    }

    /// Node variant with default parameters for this class.
    pub fn node_kind(self) -> NodeKind {
        match self {
            NodeClass::Event => NodeKind::Event(EventObject::default()),
            NodeClass::CollisionShape => NodeKind::CollisionShape(CollisionShape::Sphere {
                center: [0.0; 3],
                radius: 1.0,
            }),
            NodeClass::Attachment => NodeKind::Attachment(Attachment::default()),
            NodeClass::Helper => NodeKind::Helper,
        }
    }
}
