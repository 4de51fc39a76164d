//! Configuration module for the Aqar engine
//!
//! Reference tables (size ranges, area tiers, subtype profiles, form rules)
//! are immutable after construction and shared read-only across requests.
//! Loading goes through validating constructors so a data-entry error is
//! caught at startup, not at prediction time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::errors::{EngineError, EngineResult};
use crate::models::types::{AreaTier, FieldName, PropertyType, PropertyUsage};

// ============================================
// Size-Range Table
// ============================================

/// Typical size bounds for one bedroom bucket, from historical transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeRangeEntry {
    pub bedrooms: u8,
    pub min_typical: f64,
    pub max_typical: f64,
    pub average: f64,
    pub median: f64,
}

/// Size bounds per bedroom bucket (Studio = 0)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<SizeRangeEntry>", into = "Vec<SizeRangeEntry>")]
pub struct SizeRangeTable {
    entries: BTreeMap<u8, SizeRangeEntry>,
}

impl SizeRangeTable {
    pub fn new(entries: Vec<SizeRangeEntry>) -> EngineResult<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if entry.min_typical <= 0.0 || entry.average <= 0.0 || entry.median <= 0.0 {
                return Err(EngineError::invalid_table(format!(
                    "size range for {} bedrooms has non-positive bounds",
                    entry.bedrooms
                )));
            }
            if !(entry.min_typical <= entry.median && entry.median <= entry.max_typical) {
                return Err(EngineError::invalid_table(format!(
                    "size range for {} bedrooms violates min <= median <= max",
                    entry.bedrooms
                )));
            }
            map.insert(entry.bedrooms, entry);
        }
        Ok(Self { entries: map })
    }

    pub fn lookup(&self, bedrooms: u8) -> Option<&SizeRangeEntry> {
        self.entries.get(&bedrooms)
    }

    /// Auto-fill suggestion: the historical average size for the bucket
    pub fn suggest_area_size(&self, bedrooms: u8) -> Option<f64> {
        self.lookup(bedrooms).map(|e| e.average)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &SizeRangeEntry> {
        self.entries.values()
    }
}

impl TryFrom<Vec<SizeRangeEntry>> for SizeRangeTable {
    type Error = EngineError;

    fn try_from(entries: Vec<SizeRangeEntry>) -> EngineResult<Self> {
        Self::new(entries)
    }
}

impl From<SizeRangeTable> for Vec<SizeRangeEntry> {
    fn from(table: SizeRangeTable) -> Self {
        table.entries.into_values().collect()
    }
}

// ============================================
// Area-Tier Table
// ============================================

/// Pricing tier and multiplier for one area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaTierEntry {
    pub tier: AreaTier,
    pub multiplier: f64,
}

/// Normalized area name -> (tier, multiplier)
///
/// Keys are trimmed and uppercased at construction so lookups are
/// case-insensitive. Multiplier ordering across tiers is asserted here:
/// every multiplier of a higher tier must be >= every multiplier of a
/// lower tier, otherwise the table is a data-entry error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, AreaTierEntry>", into = "HashMap<String, AreaTierEntry>")]
pub struct AreaTierTable {
    entries: HashMap<String, AreaTierEntry>,
}

impl AreaTierTable {
    pub fn new(entries: HashMap<String, AreaTierEntry>) -> EngineResult<Self> {
        let mut normalized = HashMap::with_capacity(entries.len());
        for (name, entry) in entries {
            if entry.multiplier <= 0.0 || !entry.multiplier.is_finite() {
                return Err(EngineError::invalid_table(format!(
                    "area {:?} has non-positive multiplier {}",
                    name, entry.multiplier
                )));
            }
            normalized.insert(Self::normalize(&name), entry);
        }

        let table = Self {
            entries: normalized,
        };
        table.assert_tier_ordering()?;
        Ok(table)
    }

    fn normalize(name: &str) -> String {
        name.trim().to_uppercase()
    }

    fn assert_tier_ordering(&self) -> EngineResult<()> {
        // min multiplier per tier must not undercut the max of any lower tier
        let mut min_by_tier: BTreeMap<u8, f64> = BTreeMap::new();
        let mut max_by_tier: BTreeMap<u8, f64> = BTreeMap::new();
        for entry in self.entries.values() {
            let rank = entry.tier.rank();
            let min = min_by_tier.entry(rank).or_insert(entry.multiplier);
            *min = min.min(entry.multiplier);
            let max = max_by_tier.entry(rank).or_insert(entry.multiplier);
            *max = max.max(entry.multiplier);
        }

        for (&high_rank, &high_min) in &min_by_tier {
            for (&low_rank, &low_max) in &max_by_tier {
                if high_rank > low_rank && high_min < low_max {
                    return Err(EngineError::tier_ordering(format!(
                        "tier rank {} has multiplier {} below rank {} multiplier {}",
                        high_rank, high_min, low_rank, low_max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Exact case-insensitive match; the caller owns the fallback policy
    pub fn lookup(&self, area_name: &str) -> Option<&AreaTierEntry> {
        self.entries.get(&Self::normalize(area_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted area names, for encoders and the /areas endpoint
    pub fn area_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TryFrom<HashMap<String, AreaTierEntry>> for AreaTierTable {
    type Error = EngineError;

    fn try_from(entries: HashMap<String, AreaTierEntry>) -> EngineResult<Self> {
        Self::new(entries)
    }
}

impl From<AreaTierTable> for HashMap<String, AreaTierEntry> {
    fn from(table: AreaTierTable) -> Self {
        table.entries
    }
}

// ============================================
// Subtype Profiles
// ============================================

/// Typical bedroom span and size span observed for a subtype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtypeProfile {
    pub typical_bedrooms: [u8; 2],
    pub size_range: [f64; 2],
}

/// Subtype name -> observed profile, advisory checks only
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtypeProfileTable {
    profiles: HashMap<String, SubtypeProfile>,
}

impl SubtypeProfileTable {
    pub fn new(profiles: HashMap<String, SubtypeProfile>) -> Self {
        Self { profiles }
    }

    pub fn lookup(&self, subtype: &str) -> Option<&SubtypeProfile> {
        self.profiles.get(subtype)
    }

    pub fn profiles(&self) -> &HashMap<String, SubtypeProfile> {
        &self.profiles
    }
}

// ============================================
// Form Rules
// ============================================

/// Field policy source data for one (usage, type) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRule {
    pub usage: PropertyUsage,
    pub property_type: PropertyType,
    #[serde(default)]
    pub required: Vec<FieldName>,
    #[serde(default)]
    pub hidden: Vec<FieldName>,
    /// area_size is prefilled from the bedroom bucket average
    #[serde(default)]
    pub auto_fill_area_size: bool,
}

/// Table-driven form dependencies: which fields apply per configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRuleTable {
    pub rules: Vec<FormRule>,
    /// Known subtype vocabulary per property type (mismatch check)
    pub known_subtypes: BTreeMap<PropertyType, Vec<String>>,
    /// Subtypes that never carry bedrooms; narrows bedrooms to Hidden
    pub bedroomless_subtypes: Vec<String>,
}

impl FormRuleTable {
    pub fn rule_for(&self, usage: PropertyUsage, property_type: PropertyType) -> Option<&FormRule> {
        self.rules
            .iter()
            .find(|r| r.usage == usage && r.property_type == property_type)
    }

    pub fn known_subtypes_for(&self, property_type: PropertyType) -> Option<&[String]> {
        self.known_subtypes.get(&property_type).map(|v| v.as_slice())
    }

    pub fn is_bedroomless_subtype(&self, subtype: &str) -> bool {
        self.bedroomless_subtypes.iter().any(|s| s == subtype)
    }

    /// All known subtypes across property types, sorted and deduplicated
    pub fn all_subtypes(&self) -> Vec<String> {
        let mut subtypes: Vec<String> = self.known_subtypes.values().flatten().cloned().collect();
        subtypes.sort();
        subtypes.dedup();
        subtypes
    }
}

// ============================================
// Bundled reference tables
// ============================================

/// Immutable reference data handed to the engine at construction time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceTables {
    pub size_ranges: SizeRangeTable,
    pub area_tiers: AreaTierTable,
    pub subtype_profiles: SubtypeProfileTable,
    pub form_rules: FormRuleTable,
}

impl ReferenceTables {
    /// Built-in tables derived from the 2000-2025 Dubai transaction analysis
    pub fn builtin() -> Self {
        let size_ranges = SizeRangeTable::new(vec![
            size_entry(0, 35.0, 65.0, 48.0, 46.0),
            size_entry(1, 60.0, 95.0, 76.0, 74.0),
            size_entry(2, 106.0, 143.0, 122.0, 120.0),
            size_entry(3, 150.0, 220.0, 180.0, 175.0),
            size_entry(4, 210.0, 330.0, 265.0, 255.0),
            size_entry(5, 300.0, 500.0, 390.0, 380.0),
            size_entry(6, 400.0, 700.0, 540.0, 520.0),
        ])
        .expect("builtin size ranges are consistent");

        let mut tiers = HashMap::new();
        tier_entry(&mut tiers, "PALM JUMEIRAH", AreaTier::UltraLuxury, 2.0);
        tier_entry(&mut tiers, "EMIRATES HILLS", AreaTier::UltraLuxury, 2.0);
        tier_entry(&mut tiers, "JUMEIRAH BAY ISLAND", AreaTier::UltraLuxury, 2.0);
        tier_entry(&mut tiers, "DOWNTOWN DUBAI", AreaTier::Luxury, 1.5);
        tier_entry(&mut tiers, "JUMEIRAH BEACH RESIDENCE", AreaTier::Luxury, 1.5);
        tier_entry(&mut tiers, "BLUEWATERS ISLAND", AreaTier::Luxury, 1.5);
        tier_entry(&mut tiers, "DUBAI MARINA", AreaTier::Premium, 1.2);
        tier_entry(&mut tiers, "BUSINESS BAY", AreaTier::Premium, 1.2);
        tier_entry(&mut tiers, "DUBAI HILLS ESTATE", AreaTier::Premium, 1.2);
        tier_entry(&mut tiers, "JUMEIRAH VILLAGE CIRCLE", AreaTier::Average, 1.0);
        tier_entry(&mut tiers, "AL BARSHA", AreaTier::Average, 1.0);
        tier_entry(&mut tiers, "DUBAI SPORTS CITY", AreaTier::Average, 1.0);
        tier_entry(&mut tiers, "INTERNATIONAL CITY", AreaTier::Budget, 0.9);
        tier_entry(&mut tiers, "DUBAI SILICON OASIS", AreaTier::Budget, 0.9);
        let area_tiers = AreaTierTable::new(tiers).expect("builtin tiers respect ordering");

        let mut profiles = HashMap::new();
        profiles.insert(
            "Flat".to_string(),
            SubtypeProfile {
                typical_bedrooms: [0, 4],
                size_range: [25.0, 350.0],
            },
        );
        profiles.insert(
            "Hotel Apartment".to_string(),
            SubtypeProfile {
                typical_bedrooms: [0, 3],
                size_range: [30.0, 250.0],
            },
        );
        profiles.insert(
            "Penthouse".to_string(),
            SubtypeProfile {
                typical_bedrooms: [3, 6],
                size_range: [250.0, 1500.0],
            },
        );
        profiles.insert(
            "Villa".to_string(),
            SubtypeProfile {
                typical_bedrooms: [2, 7],
                size_range: [150.0, 1200.0],
            },
        );
        profiles.insert(
            "Townhouse".to_string(),
            SubtypeProfile {
                typical_bedrooms: [2, 5],
                size_range: [120.0, 500.0],
            },
        );
        profiles.insert(
            "Office".to_string(),
            SubtypeProfile {
                typical_bedrooms: [0, 0],
                size_range: [20.0, 2000.0],
            },
        );
        profiles.insert(
            "Shop".to_string(),
            SubtypeProfile {
                typical_bedrooms: [0, 0],
                size_range: [15.0, 1500.0],
            },
        );
        let subtype_profiles = SubtypeProfileTable::new(profiles);

        let form_rules = FormRuleTable {
            rules: vec![
                FormRule {
                    usage: PropertyUsage::Residential,
                    property_type: PropertyType::Unit,
                    required: vec![
                        FieldName::Subtype,
                        FieldName::AreaSize,
                        FieldName::Bedrooms,
                        FieldName::AreaName,
                        FieldName::RegistrationType,
                    ],
                    hidden: vec![],
                    auto_fill_area_size: true,
                },
                FormRule {
                    usage: PropertyUsage::Residential,
                    property_type: PropertyType::Villa,
                    required: vec![
                        FieldName::Subtype,
                        FieldName::AreaSize,
                        FieldName::Bedrooms,
                        FieldName::AreaName,
                        FieldName::RegistrationType,
                    ],
                    hidden: vec![],
                    auto_fill_area_size: true,
                },
                FormRule {
                    usage: PropertyUsage::Residential,
                    property_type: PropertyType::Land,
                    required: vec![FieldName::AreaSize, FieldName::AreaName],
                    hidden: vec![
                        FieldName::Bedrooms,
                        FieldName::HasParking,
                        FieldName::HasProject,
                    ],
                    auto_fill_area_size: false,
                },
                FormRule {
                    usage: PropertyUsage::Residential,
                    property_type: PropertyType::Building,
                    required: vec![FieldName::AreaSize, FieldName::AreaName],
                    hidden: vec![FieldName::Bedrooms],
                    auto_fill_area_size: false,
                },
                FormRule {
                    usage: PropertyUsage::Commercial,
                    property_type: PropertyType::Unit,
                    required: vec![
                        FieldName::Subtype,
                        FieldName::AreaSize,
                        FieldName::AreaName,
                        FieldName::RegistrationType,
                    ],
                    hidden: vec![FieldName::Bedrooms],
                    auto_fill_area_size: false,
                },
                FormRule {
                    usage: PropertyUsage::Commercial,
                    property_type: PropertyType::Land,
                    required: vec![FieldName::AreaSize, FieldName::AreaName],
                    hidden: vec![
                        FieldName::Bedrooms,
                        FieldName::HasParking,
                        FieldName::HasProject,
                    ],
                    auto_fill_area_size: false,
                },
                FormRule {
                    usage: PropertyUsage::Commercial,
                    property_type: PropertyType::Building,
                    required: vec![FieldName::AreaSize, FieldName::AreaName],
                    hidden: vec![FieldName::Bedrooms],
                    auto_fill_area_size: false,
                },
            ],
            known_subtypes: BTreeMap::from([
                (
                    PropertyType::Unit,
                    vec![
                        "Flat".to_string(),
                        "Hotel Apartment".to_string(),
                        "Office".to_string(),
                        "Penthouse".to_string(),
                        "Shop".to_string(),
                    ],
                ),
                (
                    PropertyType::Villa,
                    vec!["Townhouse".to_string(), "Villa".to_string()],
                ),
                (
                    PropertyType::Land,
                    vec![
                        "Commercial Land".to_string(),
                        "Residential Land".to_string(),
                    ],
                ),
                (
                    PropertyType::Building,
                    vec![
                        "Commercial Building".to_string(),
                        "Residential Building".to_string(),
                    ],
                ),
            ]),
            bedroomless_subtypes: vec![
                "Office".to_string(),
                "Shop".to_string(),
                "Showroom".to_string(),
                "Warehouse".to_string(),
            ],
        };

        Self {
            size_ranges,
            area_tiers,
            subtype_profiles,
            form_rules,
        }
    }

    /// Load tables from a directory of JSON files, falling back per file
    /// is not supported: either all four parse and validate, or the load
    /// fails with a CFG error.
    pub fn from_json_dir(dir: &Path) -> EngineResult<Self> {
        let size_ranges: SizeRangeTable = read_json(&dir.join("size_ranges.json"))?;
        let area_tiers: AreaTierTable = read_json(&dir.join("area_tiers.json"))?;
        let subtype_profiles: SubtypeProfileTable =
            read_json(&dir.join("subtype_profiles.json"))?;
        let form_rules: FormRuleTable = read_json(&dir.join("form_rules.json"))?;

        info!(
            areas = area_tiers.len(),
            size_buckets = size_ranges.len(),
            "reference tables loaded from {}",
            dir.display()
        );

        Ok(Self {
            size_ranges,
            area_tiers,
            subtype_profiles,
            form_rules,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn size_entry(bedrooms: u8, min: f64, max: f64, average: f64, median: f64) -> SizeRangeEntry {
    SizeRangeEntry {
        bedrooms,
        min_typical: min,
        max_typical: max,
        average,
        median,
    }
}

fn tier_entry(map: &mut HashMap<String, AreaTierEntry>, name: &str, tier: AreaTier, mult: f64) {
    map.insert(
        name.to_string(),
        AreaTierEntry {
            tier,
            multiplier: mult,
        },
    );
}

// ============================================
// Server configuration
// ============================================

/// Configuration for the API server binary
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port (PORT for cloud platforms, AQAR_PORT for local dev)
    pub port: u16,
    /// Optional directory of JSON reference tables; builtin when unset
    pub tables_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("AQAR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .or_else(|_| std::env::var("AQAR_PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            tables_dir: std::env::var("AQAR_TABLES_DIR").ok().map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_load() {
        let tables = ReferenceTables::builtin();
        assert!(tables.area_tiers.len() >= 10);
        assert_eq!(tables.size_ranges.len(), 7);
        assert!(tables
            .form_rules
            .rule_for(PropertyUsage::Residential, PropertyType::Unit)
            .is_some());
    }

    #[test]
    fn test_area_lookup_case_insensitive() {
        let tables = ReferenceTables::builtin();
        let entry = tables.area_tiers.lookup("dubai marina").unwrap();
        assert_eq!(entry.tier, AreaTier::Premium);
        assert!((entry.multiplier - 1.2).abs() < 1e-9);
        assert!(tables.area_tiers.lookup("  Dubai Marina  ").is_some());
    }

    #[test]
    fn test_size_table_rejects_inverted_bounds() {
        let result = SizeRangeTable::new(vec![size_entry(2, 143.0, 106.0, 122.0, 120.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tier_ordering_violation_rejected() {
        let mut tiers = HashMap::new();
        tier_entry(&mut tiers, "AREA A", AreaTier::Luxury, 1.1);
        tier_entry(&mut tiers, "AREA B", AreaTier::Budget, 1.4);
        let err = AreaTierTable::new(tiers).unwrap_err();
        assert_eq!(err.code_str(), "CFG_TIER_ORDERING");
    }

    #[test]
    fn test_suggest_area_size() {
        let tables = ReferenceTables::builtin();
        assert_eq!(tables.size_ranges.suggest_area_size(2), Some(122.0));
        assert_eq!(tables.size_ranges.suggest_area_size(9), None);
    }

    #[test]
    fn test_size_table_json_round_trip() {
        let tables = ReferenceTables::builtin();
        let raw = serde_json::to_string(&tables.size_ranges).unwrap();
        let back: SizeRangeTable = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.lookup(2).unwrap().min_typical, 106.0);
    }
}
