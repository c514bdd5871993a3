//! The "config singletons" of §6: network name, device, and interface
//! names that feed into the hook environment. Mirrors the donor's
//! `AppConfig` — a plain `serde::Deserialize` struct loadable from a TOML
//! file, with sensible defaults so a daemon can construct one inline
//! without a config file during tests.

use serde::Deserialize;

/// Process-wide naming configuration threaded through into hook events.
/// `myself` (the local node) is deliberately not part of this struct: it's
/// a live `Rc<Node>`, not serializable configuration data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableConfig {
    /// Network name (tinc calls this `netname`), `""` if unset.
    #[serde(default)]
    pub netname: Option<String>,
    /// tun/tap device name, `""` if unset.
    #[serde(default)]
    pub device: Option<String>,
    /// OS interface name, `""` if unset.
    #[serde(default)]
    pub iface: Option<String>,
}

impl TableConfig {
    /// Loads configuration from a TOML string, e.g. the `[subnet]` table of
    /// a larger daemon config file.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: TableConfig = toml::de::from_str(contents)?;
        Ok(config)
    }

    pub(crate) fn netname_str(&self) -> &str {
        self.netname.as_deref().unwrap_or("")
    }

    pub(crate) fn device_str(&self) -> &str {
        self.device.as_deref().unwrap_or("")
    }

    pub(crate) fn iface_str(&self) -> &str {
        self.iface.as_deref().unwrap_or("")
    }
}
