//! Entity identifiers and reference values

use serde::{Deserialize, Serialize};
use std::fmt;

/// A network-wide entity identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i32);

impl EntityId {
    /// The null entity id
    pub const NONE: Self = Self(0);

    /// Create an EntityId from a raw value
    pub fn from_raw(id: i32) -> Self {
        Self(id)
    }

    /// Get the raw i32 value
    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which part of an entity a mailbox addresses. Stored in the top 3 bits
/// of the address salt on the wire.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxComponent {
    #[default]
    Cell,
    Base,
    Client,
    BaseViaCell,
    ClientViaCell,
    CellViaBase,
    ClientViaBase,
    Service,
}

impl MailboxComponent {
    const ALL: [Self; 8] = [
        Self::Cell,
        Self::Base,
        Self::Client,
        Self::BaseViaCell,
        Self::ClientViaCell,
        Self::CellViaBase,
        Self::ClientViaBase,
        Self::Service,
    ];

    pub fn from_index(index: u16) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u16 {
        *self as u16
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cell => "cell",
            Self::Base => "base",
            Self::Client => "client",
            Self::BaseViaCell => "base_via_cell",
            Self::ClientViaCell => "client_via_cell",
            Self::CellViaBase => "cell_via_base",
            Self::ClientViaBase => "client_via_base",
            Self::Service => "service",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// A reference to a remote entity: its id, the address of the process
/// hosting it, and which component of the entity is addressed.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct MailboxRef {
    pub id: EntityId,
    pub ip: u32,
    pub port: u16,
    pub component: MailboxComponent,
    pub type_id: u16,
}

impl MailboxRef {
    /// Largest entity type id that fits beside the component bits
    pub const MAX_TYPE_ID: u16 = 0x1FFF;

    pub fn new(id: EntityId, ip: u32, port: u16, component: MailboxComponent, type_id: u16) -> Self {
        Self {
            id,
            ip,
            port,
            component,
            type_id: type_id & Self::MAX_TYPE_ID,
        }
    }

    /// The null mailbox
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        *self == Self::default()
    }

    /// Component and type id packed as they travel on the wire
    pub fn salt(&self) -> u16 {
        (self.component.index() << 13) | (self.type_id & Self::MAX_TYPE_ID)
    }

    /// Split a wire salt back into component and type id
    pub fn split_salt(salt: u16) -> (MailboxComponent, u16) {
        let component = MailboxComponent::from_index(salt >> 13).unwrap_or_default();
        (component, salt & Self::MAX_TYPE_ID)
    }
}

/// A 128-bit unique identifier, as used for user data object references.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct UniqueId {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

impl UniqueId {
    pub const ZERO: Self = Self { a: 0, b: 0, c: 0, d: 0 };

    pub const fn new(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self { a, b, c, d }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn to_array(&self) -> [u32; 4] {
        [self.a, self.b, self.c, self.d]
    }

    /// Parse the `XXXXXXXX.XXXXXXXX.XXXXXXXX.XXXXXXXX` text form
    pub fn parse(s: &str) -> Option<Self> {
        let mut words = [0u32; 4];
        let mut parts = s.split('.');
        for word in words.iter_mut() {
            let part = parts.next()?;
            if part.len() != 8 {
                return None;
            }
            *word = u32::from_str_radix(part, 16).ok()?;
        }
        if parts.next().is_some() {
            return None;
        }
        let [a, b, c, d] = words;
        Some(Self { a, b, c, d })
    }
}

impl fmt::Debug for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueId({})", self)
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}.{:08X}.{:08X}.{:08X}", self.a, self.b, self.c, self.d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        let id = EntityId::from_raw(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(EntityId::default(), EntityId::NONE);
    }

    #[test]
    fn test_mailbox_salt() {
        let mb = MailboxRef::new(EntityId(7), 0x7F000001, 20013, MailboxComponent::Base, 12);
        let (component, type_id) = MailboxRef::split_salt(mb.salt());
        assert_eq!(component, MailboxComponent::Base);
        assert_eq!(type_id, 12);
        assert!(!mb.is_none());
        assert!(MailboxRef::none().is_none());
    }

    #[test]
    fn test_component_names() {
        for index in 0..8 {
            let c = MailboxComponent::from_index(index).unwrap();
            assert_eq!(MailboxComponent::from_name(c.name()), Some(c));
        }
        assert!(MailboxComponent::from_index(8).is_none());
    }

    #[test]
    fn test_unique_id_text() {
        let id = UniqueId::new(1, 0xABCDEF, 3, 0xFFFFFFFF);
        let text = id.to_string();
        assert_eq!(text, "00000001.00ABCDEF.00000003.FFFFFFFF");
        assert_eq!(UniqueId::parse(&text), Some(id));
        assert!(UniqueId::parse("1.2.3.4").is_none());
    }
}
