use std::fmt::Display;
use std::ops::Deref;
use uuid::Uuid;

/// Account that owns campaigns and subscribers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Deref for OwnerId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Uuid> for OwnerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Entities that belong to exactly one owner.
pub trait Owned {
    fn id(&self) -> Uuid;
    fn owner_id(&self) -> OwnerId;
}

impl Owned for crate::domain::Campaign {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Owned for crate::domain::Subscriber {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}
