//! Advisory input validation
//!
//! Checks a request against the resolved field policy, the size-range table
//! and the subtype profiles. Findings are warnings only: validation never
//! mutates the request and never blocks the prediction. Warning order is
//! stable (structural, then range, then mismatch) so callers can assert on
//! it. Unknown area names are not a validator concern; the price adjuster
//! owns that fallback.

use crate::core::form_rules::FieldPolicy;
use crate::models::config::ReferenceTables;
use crate::models::types::{
    FieldName, FieldRequirement, PropertyRequest, PropertyType, Warning,
};

pub struct Validator<'a> {
    tables: &'a ReferenceTables,
}

impl<'a> Validator<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self { tables }
    }

    pub fn validate(&self, request: &PropertyRequest, policy: &FieldPolicy) -> Vec<Warning> {
        let mut warnings = Vec::new();
        self.check_field_policy(request, policy, &mut warnings);
        self.check_size_range(request, policy, &mut warnings);
        self.check_mismatches(request, &mut warnings);
        warnings
    }

    /// Structural findings: hidden fields carrying values, required fields
    /// absent. Field order is the policy's deterministic order.
    fn check_field_policy(
        &self,
        request: &PropertyRequest,
        policy: &FieldPolicy,
        warnings: &mut Vec<Warning>,
    ) {
        for (field, requirement) in policy.fields() {
            match requirement {
                FieldRequirement::Hidden if request.conflicts_when_hidden(field) => {
                    warnings.push(Warning::HiddenFieldSupplied { field });
                }
                FieldRequirement::Required if !request.is_provided(field) => {
                    warnings.push(Warning::RequiredFieldMissing { field });
                }
                _ => {}
            }
        }
    }

    /// Range advisory against the bedroom bucket's typical bounds.
    /// Skipped when bedrooms are hidden or absent: without a bucket there
    /// is no empirical range to compare against.
    fn check_size_range(
        &self,
        request: &PropertyRequest,
        policy: &FieldPolicy,
        warnings: &mut Vec<Warning>,
    ) {
        if policy.is_hidden(FieldName::Bedrooms) {
            return;
        }
        let Some(bedrooms) = request.bedrooms else {
            return;
        };
        let Some(range) = self.tables.size_ranges.lookup(bedrooms.count()) else {
            return;
        };

        if request.area_size < range.min_typical {
            warnings.push(Warning::SizeBelowTypicalRange {
                area_size: request.area_size,
                min_typical: range.min_typical,
                max_typical: range.max_typical,
                bucket: bedrooms.bucket_label(),
            });
        } else if request.area_size > range.max_typical {
            warnings.push(Warning::SizeAboveTypicalRange {
                area_size: request.area_size,
                min_typical: range.min_typical,
                max_typical: range.max_typical,
                bucket: bedrooms.bucket_label(),
            });
        }
    }

    /// Type/subtype mismatch findings, plus the subtype profile advisories.
    fn check_mismatches(&self, request: &PropertyRequest, warnings: &mut Vec<Warning>) {
        if request.property_type == PropertyType::Land {
            if let Some(bedrooms) = request.bedrooms {
                if bedrooms.count() > 0 {
                    warnings.push(Warning::LandWithBedrooms {
                        bedrooms: bedrooms.count(),
                    });
                }
            }
        }

        let Some(subtype) = request.subtype.as_deref() else {
            return;
        };

        if let Some(known) = self.tables.form_rules.known_subtypes_for(request.property_type) {
            if !known.iter().any(|s| s == subtype) {
                warnings.push(Warning::UnknownSubtype {
                    subtype: subtype.to_string(),
                    property_type: request.property_type,
                });
            }
        }

        if let Some(profile) = self.tables.subtype_profiles.lookup(subtype) {
            if let Some(bedrooms) = request.bedrooms {
                let [lo, hi] = profile.typical_bedrooms;
                if bedrooms.count() < lo || bedrooms.count() > hi {
                    warnings.push(Warning::AtypicalBedrooms {
                        subtype: subtype.to_string(),
                        bedrooms: bedrooms.count(),
                        typical_min: lo,
                        typical_max: hi,
                    });
                }
            }
            let [min_size, max_size] = profile.size_range;
            if request.area_size < min_size || request.area_size > max_size {
                warnings.push(Warning::SubtypeSizeMismatch {
                    subtype: subtype.to_string(),
                    area_size: request.area_size,
                    min_typical: min_size,
                    max_typical: max_size,
                });
            }
        }
    }
}
