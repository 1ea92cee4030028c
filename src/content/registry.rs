//! Content registry for validated, read-only definitions.
//!
//! `ContentRegistryBuilder` collects definitions and checks every
//! cross-reference in `build()`. The resulting `ContentRegistry` is wrapped in
//! an `Arc` and shared read-only by each `World` that uses it.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::defs::{
    BuffDef, HaulSource, InteractionKind, NeedDef, ObjectDef, ResourceDef, TerrainDef,
};
use crate::core::error::{Result, SimError};
use crate::core::types::{BuffId, NeedId, ObjectDefId, ResourceId, TerrainId};

/// Frozen set of definitions
#[derive(Debug)]
pub struct ContentRegistry {
    needs: BTreeMap<NeedId, NeedDef>,
    buffs: BTreeMap<BuffId, BuffDef>,
    objects: BTreeMap<ObjectDefId, ObjectDef>,
    terrains: BTreeMap<TerrainId, TerrainDef>,
    resources: BTreeMap<ResourceId, ResourceDef>,
    /// Need -> (object definition, interaction index) pairs that satisfy it
    satisfiers: BTreeMap<NeedId, Vec<(ObjectDefId, usize)>>,
    default_terrain: TerrainId,
    fingerprint: u64,
}

impl ContentRegistry {
    pub fn need(&self, id: NeedId) -> Option<&NeedDef> {
        self.needs.get(&id)
    }

    pub fn buff(&self, id: BuffId) -> Option<&BuffDef> {
        self.buffs.get(&id)
    }

    pub fn object(&self, id: ObjectDefId) -> Option<&ObjectDef> {
        self.objects.get(&id)
    }

    pub fn terrain(&self, id: TerrainId) -> Option<&TerrainDef> {
        self.terrains.get(&id)
    }

    pub fn resource(&self, id: ResourceId) -> Option<&ResourceDef> {
        self.resources.get(&id)
    }

    /// Needs in ascending id order
    pub fn needs(&self) -> impl Iterator<Item = &NeedDef> {
        self.needs.values()
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectDef> {
        self.objects.values()
    }

    pub fn terrains(&self) -> impl Iterator<Item = &TerrainDef> {
        self.terrains.values()
    }

    /// (object definition, interaction index) pairs that restore `need`
    pub fn satisfiers_of(&self, need: NeedId) -> &[(ObjectDefId, usize)] {
        self.satisfiers
            .get(&need)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Terrain new maps are filled with (the first walkable terrain registered)
    pub fn default_terrain(&self) -> TerrainId {
        self.default_terrain
    }

    pub fn find_object(&self, name: &str) -> Option<&ObjectDef> {
        self.objects.values().find(|o| o.name == name)
    }

    pub fn find_terrain(&self, name: &str) -> Option<&TerrainDef> {
        self.terrains.values().find(|t| t.name == name)
    }

    pub fn find_need(&self, name: &str) -> Option<&NeedDef> {
        self.needs.values().find(|n| n.name == name)
    }

    /// Stable digest of every definition, stored in saves
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// Collects definitions before freezing them
#[derive(Debug, Default)]
pub struct ContentRegistryBuilder {
    needs: BTreeMap<NeedId, NeedDef>,
    buffs: BTreeMap<BuffId, BuffDef>,
    objects: BTreeMap<ObjectDefId, ObjectDef>,
    terrains: BTreeMap<TerrainId, TerrainDef>,
    resources: BTreeMap<ResourceId, ResourceDef>,
    default_terrain: Option<TerrainId>,
    errors: Vec<String>,
}

impl ContentRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn need(mut self, def: NeedDef) -> Self {
        if self.needs.contains_key(&def.id) {
            self.errors.push(format!("duplicate need id {:?}", def.id));
        }
        self.needs.insert(def.id, def);
        self
    }

    pub fn buff(mut self, def: BuffDef) -> Self {
        if self.buffs.contains_key(&def.id) {
            self.errors.push(format!("duplicate buff id {:?}", def.id));
        }
        self.buffs.insert(def.id, def);
        self
    }

    pub fn object(mut self, def: ObjectDef) -> Self {
        if self.objects.contains_key(&def.id) {
            self.errors.push(format!("duplicate object id {:?}", def.id));
        }
        self.objects.insert(def.id, def);
        self
    }

    pub fn terrain(mut self, def: TerrainDef) -> Self {
        if self.terrains.contains_key(&def.id) {
            self.errors.push(format!("duplicate terrain id {:?}", def.id));
        }
        if self.default_terrain.is_none() && def.walkable {
            self.default_terrain = Some(def.id);
        }
        self.terrains.insert(def.id, def);
        self
    }

    pub fn resource(mut self, def: ResourceDef) -> Self {
        if self.resources.contains_key(&def.id) {
            self.errors.push(format!("duplicate resource id {:?}", def.id));
        }
        self.resources.insert(def.id, def);
        self
    }

    /// Validate all cross-references and freeze the registry
    pub fn build(self) -> Result<Arc<ContentRegistry>> {
        let mut errors = self.errors;

        for need in self.needs.values() {
            if !(0.0..=100.0).contains(&need.initial) {
                errors.push(format!("need '{}' initial out of [0, 100]", need.name));
            }
            if need.decay_per_tick < 0.0 {
                errors.push(format!("need '{}' has negative decay", need.name));
            }
            for threshold in [need.low, need.critical].into_iter().flatten() {
                if !self.buffs.contains_key(&threshold.buff) {
                    errors.push(format!(
                        "need '{}' references unknown buff {:?}",
                        need.name, threshold.buff
                    ));
                }
            }
        }

        for terrain in self.terrains.values() {
            if terrain.walkable && terrain.move_cost < 1.0 {
                errors.push(format!("terrain '{}' move_cost must be >= 1", terrain.name));
            }
            if let Some(res) = terrain.resource {
                if !self.resources.contains_key(&res) {
                    errors.push(format!(
                        "terrain '{}' references unknown resource {:?}",
                        terrain.name, res
                    ));
                }
            }
        }

        let mut satisfiers: BTreeMap<NeedId, Vec<(ObjectDefId, usize)>> = BTreeMap::new();
        for object in self.objects.values() {
            if object.footprint.0 == 0 || object.footprint.1 == 0 {
                errors.push(format!("object '{}' has an empty footprint", object.name));
            }
            if object.use_area.is_empty() && !object.interactions.is_empty() {
                errors.push(format!("object '{}' has no use area", object.name));
            }
            for &(dx, dy) in &object.use_area {
                let inside = dx >= 0
                    && dy >= 0
                    && (dx as u32) < object.footprint.0
                    && (dy as u32) < object.footprint.1;
                if inside {
                    errors.push(format!(
                        "object '{}' use area ({}, {}) lies inside its footprint",
                        object.name, dx, dy
                    ));
                }
            }
            if let Some(store) = &object.store {
                if store.initial > store.max {
                    errors.push(format!("object '{}' store initial > max", object.name));
                }
                if !self.resources.contains_key(&store.resource) {
                    errors.push(format!(
                        "object '{}' store references unknown resource",
                        object.name
                    ));
                }
            }
            if let Some(haul) = &object.haul {
                if haul.per_trip == 0 {
                    errors.push(format!("object '{}' haul per_trip is 0", object.name));
                }
                match haul.source {
                    HaulSource::Object(src) => match self.objects.get(&src) {
                        Some(s) if s.store.map(|st| st.resource) == Some(haul.resource) => {}
                        _ => errors.push(format!(
                            "object '{}' hauls from an object without a matching store",
                            object.name
                        )),
                    },
                    HaulSource::Terrain(t) => match self.terrains.get(&t) {
                        Some(td) if td.resource == Some(haul.resource) => {}
                        _ => errors.push(format!(
                            "object '{}' hauls from terrain without the resource",
                            object.name
                        )),
                    },
                }
                if object.store.map(|s| s.resource) != Some(haul.resource) {
                    errors.push(format!(
                        "object '{}' haul destination needs a store of the hauled resource",
                        object.name
                    ));
                }
            }
            for (index, interaction) in object.interactions.iter().enumerate() {
                if interaction.kind == InteractionKind::Haul && object.haul.is_none() {
                    errors.push(format!(
                        "object '{}' offers Haul without a haul definition",
                        object.name
                    ));
                }
                if let Some(buff) = interaction.grant_buff {
                    match self.buffs.get(&buff) {
                        Some(b) if b.duration.is_some() => {}
                        Some(_) => errors.push(format!(
                            "object '{}' grants buff {:?} without a duration",
                            object.name, buff
                        )),
                        None => errors.push(format!(
                            "object '{}' grants unknown buff {:?}",
                            object.name, buff
                        )),
                    }
                }
                for gain in &interaction.satisfies {
                    if !self.needs.contains_key(&gain.need) {
                        errors.push(format!(
                            "object '{}' satisfies unknown need {:?}",
                            object.name, gain.need
                        ));
                        continue;
                    }
                    if gain.amount > 0.0 && object.offers(index) {
                        let list = satisfiers.entry(gain.need).or_default();
                        if !list.contains(&(object.id, index)) {
                            list.push((object.id, index));
                        }
                    }
                }
            }
        }

        let Some(default_terrain) = self.default_terrain else {
            errors.push("no walkable terrain registered".into());
            return Err(SimError::InvalidContent(errors.join("; ")));
        };

        if !errors.is_empty() {
            return Err(SimError::InvalidContent(errors.join("; ")));
        }

        let fingerprint = fingerprint_of(&[
            serde_json::to_string(&self.needs.values().collect::<Vec<_>>())?,
            serde_json::to_string(&self.buffs.values().collect::<Vec<_>>())?,
            serde_json::to_string(&self.objects.values().collect::<Vec<_>>())?,
            serde_json::to_string(&self.terrains.values().collect::<Vec<_>>())?,
            serde_json::to_string(&self.resources.values().collect::<Vec<_>>())?,
        ]);

        Ok(Arc::new(ContentRegistry {
            needs: self.needs,
            buffs: self.buffs,
            objects: self.objects,
            terrains: self.terrains,
            resources: self.resources,
            satisfiers,
            default_terrain,
            fingerprint,
        }))
    }
}

/// FNV-1a over the serialized definition tables
fn fingerprint_of(parts: &[String]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for part in parts {
        for byte in part.bytes().chain(std::iter::once(0xff)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}
