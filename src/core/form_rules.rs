//! Form-Dependency Resolver
//!
//! Resolves which request fields are required, optional, hidden or
//! auto-filled for a given (usage, type) pair. Policy is table-driven with
//! a single documented fallback: unknown pairs resolve to all-Optional,
//! since the engine does not own domain exhaustiveness.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::config::FormRuleTable;
use crate::models::types::{FieldName, FieldRequirement, PropertyType, PropertyUsage};

/// Per-field requirements for one property configuration
///
/// Backed by a BTreeMap so iteration (and therefore warning emission
/// downstream) is deterministic in field declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPolicy {
    fields: BTreeMap<FieldName, FieldRequirement>,
}

impl FieldPolicy {
    /// The permissive fallback: every field Optional
    pub fn all_optional() -> Self {
        let mut fields = BTreeMap::new();
        for field in FieldName::ALL {
            fields.insert(field, FieldRequirement::Optional);
        }
        Self { fields }
    }

    pub fn requirement(&self, field: FieldName) -> FieldRequirement {
        self.fields
            .get(&field)
            .copied()
            .unwrap_or(FieldRequirement::Optional)
    }

    pub fn is_hidden(&self, field: FieldName) -> bool {
        self.requirement(field) == FieldRequirement::Hidden
    }

    pub fn is_required(&self, field: FieldName) -> bool {
        self.requirement(field) == FieldRequirement::Required
    }

    /// Fields in deterministic declaration order
    pub fn fields(&self) -> impl Iterator<Item = (FieldName, FieldRequirement)> + '_ {
        self.fields.iter().map(|(f, r)| (*f, *r))
    }

    fn set(&mut self, field: FieldName, requirement: FieldRequirement) {
        self.fields.insert(field, requirement);
    }

    /// Narrowing transition: hide a field unless it is already hidden.
    /// There is no inverse; nothing ever widens Hidden back to visible.
    fn narrow_to_hidden(&mut self, field: FieldName) {
        self.fields.insert(field, FieldRequirement::Hidden);
    }
}

/// Resolves field policies against the form-rule table
pub struct FormResolver<'a> {
    table: &'a FormRuleTable,
}

impl<'a> FormResolver<'a> {
    pub fn new(table: &'a FormRuleTable) -> Self {
        Self { table }
    }

    /// Pure function of (usage, type); subtype may only narrow further.
    pub fn resolve(
        &self,
        usage: PropertyUsage,
        property_type: PropertyType,
        subtype: Option<&str>,
    ) -> FieldPolicy {
        let mut policy = FieldPolicy::all_optional();

        if let Some(rule) = self.table.rule_for(usage, property_type) {
            // usage and type discriminate the variant itself
            policy.set(FieldName::Usage, FieldRequirement::Required);
            policy.set(FieldName::PropertyType, FieldRequirement::Required);
            for &field in &rule.required {
                policy.set(field, FieldRequirement::Required);
            }
            for &field in &rule.hidden {
                policy.set(field, FieldRequirement::Hidden);
            }
            if rule.auto_fill_area_size && !policy.is_hidden(FieldName::AreaSize) {
                policy.set(FieldName::AreaSize, FieldRequirement::AutoFilled);
            }
        }

        if let Some(subtype) = subtype {
            if self.table.is_bedroomless_subtype(subtype) {
                policy.narrow_to_hidden(FieldName::Bedrooms);
            }
        }

        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ReferenceTables;

    fn tables() -> ReferenceTables {
        ReferenceTables::builtin()
    }

    #[test]
    fn test_residential_unit_policy() {
        let tables = tables();
        let resolver = FormResolver::new(&tables.form_rules);
        let policy = resolver.resolve(PropertyUsage::Residential, PropertyType::Unit, Some("Flat"));

        assert!(policy.is_required(FieldName::Bedrooms));
        assert!(policy.is_required(FieldName::AreaName));
        assert_eq!(
            policy.requirement(FieldName::AreaSize),
            FieldRequirement::AutoFilled
        );
        assert_eq!(
            policy.requirement(FieldName::HasParking),
            FieldRequirement::Optional
        );
    }

    #[test]
    fn test_land_hides_bedrooms_and_parking() {
        let tables = tables();
        let resolver = FormResolver::new(&tables.form_rules);
        let policy = resolver.resolve(PropertyUsage::Residential, PropertyType::Land, None);

        assert!(policy.is_hidden(FieldName::Bedrooms));
        assert!(policy.is_hidden(FieldName::HasParking));
        assert!(policy.is_hidden(FieldName::HasProject));
        assert!(policy.is_required(FieldName::AreaSize));
    }

    #[test]
    fn test_unknown_pair_is_all_optional() {
        let tables = tables();
        let resolver = FormResolver::new(&tables.form_rules);
        let policy = resolver.resolve(PropertyUsage::Industrial, PropertyType::Villa, None);

        for field in FieldName::ALL {
            assert_eq!(policy.requirement(field), FieldRequirement::Optional);
        }
    }

    #[test]
    fn test_subtype_narrows_bedrooms_to_hidden() {
        let tables = tables();
        let resolver = FormResolver::new(&tables.form_rules);

        // Office inside a residential unit form still hides bedrooms
        let policy = resolver.resolve(
            PropertyUsage::Residential,
            PropertyType::Unit,
            Some("Office"),
        );
        assert!(policy.is_hidden(FieldName::Bedrooms));
    }

    #[test]
    fn test_subtype_never_unhides() {
        let tables = tables();
        let resolver = FormResolver::new(&tables.form_rules);

        // Commercial unit hides bedrooms regardless of subtype
        let policy = resolver.resolve(PropertyUsage::Commercial, PropertyType::Unit, Some("Flat"));
        assert!(policy.is_hidden(FieldName::Bedrooms));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let tables = tables();
        let resolver = FormResolver::new(&tables.form_rules);
        let a = resolver.resolve(PropertyUsage::Residential, PropertyType::Unit, Some("Flat"));
        let b = resolver.resolve(PropertyUsage::Residential, PropertyType::Unit, Some("Flat"));
        assert_eq!(a, b);
        let order_a: Vec<_> = a.fields().map(|(f, _)| f).collect();
        let order_b: Vec<_> = b.fields().map(|(f, _)| f).collect();
        assert_eq!(order_a, order_b);
    }
}
