use serde::Serialize;

use crate::metric_names::{
    FLAG_ENABLED_VALUE, FLAG_USE_DDD_CHECKLIST_ANOMALIES, FLAG_USE_DDD_CHECKLIST_INIT,
    FLAG_USE_DDD_CHECKLIST_LOAD, FLAG_USE_DDD_CHECKLIST_SUBMIT,
};
use crate::migration::{ApiName, Variant};

/// Per-API switches selecting the aggregate-backed path.
///
/// Read once at startup; all flags default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationFlags {
    pub submit: bool,
    pub anomalies: bool,
    pub init: bool,
    pub load: bool,
}

impl MigrationFlags {
    /// Load flags from environment variables.
    ///
    /// | Env Var                       | Controls         |
    /// |-------------------------------|------------------|
    /// | `USE_DDD_CHECKLIST_SUBMIT`    | `submitChecklist`|
    /// | `USE_DDD_CHECKLIST_ANOMALIES` | `saveAnomalies`  |
    /// | `USE_DDD_CHECKLIST_INIT`      | `initChecklist`  |
    /// | `USE_DDD_CHECKLIST_LOAD`      | `loadChecklist`  |
    ///
    /// Only the exact value `true` enables a flag.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = |name: &str| lookup(name).as_deref() == Some(FLAG_ENABLED_VALUE);
        Self {
            submit: enabled(FLAG_USE_DDD_CHECKLIST_SUBMIT),
            anomalies: enabled(FLAG_USE_DDD_CHECKLIST_ANOMALIES),
            init: enabled(FLAG_USE_DDD_CHECKLIST_INIT),
            load: enabled(FLAG_USE_DDD_CHECKLIST_LOAD),
        }
    }

    /// Every API on the aggregate-backed path.
    pub fn all_enabled() -> Self {
        Self {
            submit: true,
            anomalies: true,
            init: true,
            load: true,
        }
    }

    pub fn is_enabled(&self, api: ApiName) -> bool {
        match api {
            ApiName::SubmitChecklist => self.submit,
            ApiName::SaveAnomalies => self.anomalies,
            ApiName::InitChecklist => self.init,
            ApiName::LoadChecklist => self.load,
        }
    }

    pub fn variant(&self, api: ApiName) -> Variant {
        if self.is_enabled(api) {
            Variant::Ddd
        } else {
            Variant::Legacy
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn flags(vars: &[(&str, &str)]) -> MigrationFlags {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MigrationFlags::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_to_legacy() {
        let flags = flags(&[]);
        for api in ApiName::ALL {
            assert_eq!(flags.variant(api), Variant::Legacy);
        }
    }

    #[test]
    fn only_exact_true_enables() {
        let flags = flags(&[
            ("USE_DDD_CHECKLIST_SUBMIT", "true"),
            ("USE_DDD_CHECKLIST_ANOMALIES", "TRUE"),
            ("USE_DDD_CHECKLIST_INIT", "1"),
            ("USE_DDD_CHECKLIST_LOAD", " true"),
        ]);
        assert_eq!(flags.variant(ApiName::SubmitChecklist), Variant::Ddd);
        assert_eq!(flags.variant(ApiName::SaveAnomalies), Variant::Legacy);
        assert_eq!(flags.variant(ApiName::InitChecklist), Variant::Legacy);
        assert_eq!(flags.variant(ApiName::LoadChecklist), Variant::Legacy);
    }

    #[test]
    fn all_enabled_routes_everything_to_ddd() {
        let flags = MigrationFlags::all_enabled();
        assert!(ApiName::ALL.iter().all(|api| flags.is_enabled(*api)));
    }
}
