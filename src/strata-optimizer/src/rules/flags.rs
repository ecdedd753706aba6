//! Rule selection flags.

use bitflags::bitflags;
use common_error::{StrataError, StrataResult};
use serde::{Deserialize, Serialize};

bitflags! {
    /// A set of rules to run. Rules always run in registry order, whatever
    /// the bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RuleFlags: u64 {
        /// Column pruning.
        const PRUNE_COLUMNS = 1 << 0;
        /// Unique key and single-row propagation.
        const BUILD_KEY_INFO = 1 << 1;
        /// Distinct elimination and aggregation-to-projection.
        const ELIMINATE_AGG = 1 << 2;
        /// Projection elimination.
        const ELIMINATE_PROJECTION = 1 << 3;
        /// Max/min to sort and limit.
        const MAX_MIN_ELIMINATE = 1 << 4;
        /// Aggregation push-down across joins and unions.
        const PUSH_DOWN_AGG = 1 << 5;
        /// Second column pruning pass after the other rewrites.
        const PRUNE_COLUMNS_AGAIN = 1 << 6;
    }
}

impl RuleFlags {
    /// Flags for the rule called `name`. `column_prune` selects both passes.
    pub fn from_rule_name(name: &str) -> StrataResult<Self> {
        Ok(match name {
            "column_prune" => Self::PRUNE_COLUMNS | Self::PRUNE_COLUMNS_AGAIN,
            "build_keys" => Self::BUILD_KEY_INFO,
            "aggregation_eliminate" => Self::ELIMINATE_AGG,
            "projection_eliminate" => Self::ELIMINATE_PROJECTION,
            "max_min_eliminate" => Self::MAX_MIN_ELIMINATE,
            "aggregation_push_down" => Self::PUSH_DOWN_AGG,
            other => return Err(StrataError::config(format!("unknown rule `{other}`"))),
        })
    }

    /// Union of the flags for every name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> StrataResult<Self> {
        names
            .iter()
            .try_fold(Self::empty(), |acc, name| Ok(acc | Self::from_rule_name(name.as_ref())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NAMES: [&str; 6] = [
        "column_prune",
        "build_keys",
        "aggregation_eliminate",
        "projection_eliminate",
        "max_min_eliminate",
        "aggregation_push_down",
    ];

    #[test]
    fn test_from_names() {
        let flags = RuleFlags::from_names(&["build_keys", "aggregation_eliminate"]).unwrap();
        assert_eq!(flags, RuleFlags::BUILD_KEY_INFO | RuleFlags::ELIMINATE_AGG);
        assert_eq!(RuleFlags::from_names::<&str>(&[]).unwrap(), RuleFlags::empty());
        assert_eq!(RuleFlags::from_names(&NAMES).unwrap(), RuleFlags::all());
    }

    #[test]
    fn test_unknown_name() {
        assert!(RuleFlags::from_rule_name("predicate_push_down").is_err());
    }

    proptest! {
        #[test]
        fn prop_names_select_exactly_their_bits(mask in 0u8..64) {
            let names: Vec<&str> = NAMES
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, n)| *n)
                .collect();
            let flags = RuleFlags::from_names(&names).unwrap();
            for name in NAMES {
                let bits = RuleFlags::from_rule_name(name).unwrap();
                prop_assert_eq!(flags.contains(bits), names.contains(&name));
            }
        }
    }
}
