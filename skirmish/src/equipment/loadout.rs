//! Equipped item container
//!
//! Enforces slot legality when items are equipped:
//! - Weapons go in the hands, body armor on the body, jewelry on neck/rings
//! - Shields go in the off hand
//! - Two-handed weapons clear both hands
//! - Off-hand weapons must be light
//! - Attunement is limited per combatant

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::item::{ArmorCategory, EquippedItem, ItemKind, Slot, WeaponProfile};

/// Errors raised when changing equipment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquipError {
    #[error("{item} cannot be equipped in the {slot} slot")]
    WrongSlot { item: String, slot: Slot },

    #[error("{0} cannot be equipped")]
    NotEquippable(String),

    #[error("{0} is not light enough to wield in the off hand")]
    NotLight(String),

    #[error("both hands are occupied by {0}")]
    TwoHandedEquipped(String),

    #[error("{0} is too unwieldy for the off hand")]
    TwoHandedOffHand(String),

    #[error("nothing is equipped in the {0} slot")]
    EmptySlot(Slot),

    #[error("{0} does not require attunement")]
    AttunementNotRequired(String),

    #[error("already attuned to {0} items")]
    AttunementLimit(usize),
}

/// Items currently equipped, one per slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<EquippedItem>", into = "Vec<EquippedItem>")]
pub struct Equipment {
    slots: BTreeMap<Slot, EquippedItem>,
}

impl From<Vec<EquippedItem>> for Equipment {
    fn from(items: Vec<EquippedItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Equipment> for Vec<EquippedItem> {
    fn from(equipment: Equipment) -> Self {
        equipment.slots.into_values().collect()
    }
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from items without legality checks (content already validated)
    pub fn from_items(items: impl IntoIterator<Item = EquippedItem>) -> Self {
        Self {
            slots: items.into_iter().map(|item| (item.slot, item)).collect(),
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&EquippedItem> {
        self.slots.get(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EquippedItem> {
        self.slots.values()
    }

    /// Items whose magical properties currently apply
    pub fn magic_items(&self) -> impl Iterator<Item = &EquippedItem> {
        self.slots.values().filter(|item| item.magic_active())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn main_hand(&self) -> Option<&EquippedItem> {
        self.slots.get(&Slot::MainHand)
    }

    pub fn off_hand(&self) -> Option<&EquippedItem> {
        self.slots.get(&Slot::OffHand)
    }

    pub fn main_hand_weapon(&self) -> Option<&WeaponProfile> {
        self.main_hand().and_then(|item| item.weapon_profile())
    }

    pub fn off_hand_weapon(&self) -> Option<&WeaponProfile> {
        self.off_hand().and_then(|item| item.weapon_profile())
    }

    pub fn attuned_count(&self) -> usize {
        self.slots.values().filter(|item| item.attuned).count()
    }

    /// Equip an item into its slot, returning whatever it displaced
    pub fn equip(&mut self, item: EquippedItem) -> Result<Vec<EquippedItem>, EquipError> {
        let slot = item.slot;
        match &item.properties {
            ItemKind::Weapon(weapon) => {
                if !slot.is_hand() {
                    return Err(EquipError::WrongSlot {
                        item: item.name.clone(),
                        slot,
                    });
                }
                if slot == Slot::OffHand {
                    if weapon.two_handed {
                        return Err(EquipError::TwoHandedOffHand(item.name.clone()));
                    }
                    if !weapon.light {
                        return Err(EquipError::NotLight(item.name.clone()));
                    }
                    if let Some(main) = self.main_hand() {
                        if main.weapon_profile().is_some_and(|w| !w.light && !w.two_handed) {
                            return Err(EquipError::NotLight(main.name.clone()));
                        }
                    }
                }
            }
            ItemKind::Armor(armor) => {
                let fits = if armor.category == ArmorCategory::Shield {
                    slot == Slot::OffHand
                } else {
                    slot.is_body()
                };
                if !fits {
                    return Err(EquipError::WrongSlot {
                        item: item.name.clone(),
                        slot,
                    });
                }
            }
            ItemKind::Jewelry(_) => {
                if !slot.is_jewelry() {
                    return Err(EquipError::WrongSlot {
                        item: item.name.clone(),
                        slot,
                    });
                }
            }
            ItemKind::Consumable => return Err(EquipError::NotEquippable(item.name.clone())),
        }

        if slot == Slot::OffHand {
            if let Some(main) = self.main_hand() {
                if main.weapon_profile().is_some_and(|w| w.two_handed) {
                    return Err(EquipError::TwoHandedEquipped(main.name.clone()));
                }
            }
        }

        let mut displaced = Vec::new();
        let two_handed = item.weapon_profile().is_some_and(|w| w.two_handed);
        // a heavy main-hand weapon cannot be paired with an off-hand weapon
        let heavy_main =
            slot == Slot::MainHand && item.weapon_profile().is_some_and(|w| !w.light);
        if two_handed {
            displaced.extend(self.slots.remove(&Slot::MainHand));
            displaced.extend(self.slots.remove(&Slot::OffHand));
        } else {
            displaced.extend(self.slots.remove(&slot));
            if heavy_main && self.off_hand_weapon().is_some() {
                displaced.extend(self.slots.remove(&Slot::OffHand));
            }
        }

        self.slots.insert(slot, item);
        Ok(displaced)
    }

    /// Remove whatever occupies a slot
    pub fn unequip(&mut self, slot: Slot) -> Option<EquippedItem> {
        self.slots.remove(&slot)
    }

    /// Attune to the item in a slot
    pub fn attune(&mut self, slot: Slot, max_attuned: usize) -> Result<(), EquipError> {
        let attuned = self.attuned_count();
        let item = self
            .slots
            .get_mut(&slot)
            .ok_or(EquipError::EmptySlot(slot))?;
        if !item.requires_attunement {
            return Err(EquipError::AttunementNotRequired(item.name.clone()));
        }
        if item.attuned {
            return Ok(());
        }
        if attuned >= max_attuned {
            return Err(EquipError::AttunementLimit(max_attuned));
        }
        item.attuned = true;
        Ok(())
    }

    /// Break attunement with the item in a slot
    pub fn unattune(&mut self, slot: Slot) -> Result<(), EquipError> {
        let item = self
            .slots
            .get_mut(&slot)
            .ok_or(EquipError::EmptySlot(slot))?;
        item.attuned = false;
        Ok(())
    }
}
