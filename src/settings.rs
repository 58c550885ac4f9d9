use config::Config;
use serde::Deserialize;
use std::net::IpAddr;

pub const DEFAULT_PROTOCOL_VERSION: i32 = 70000;
/// NODE_NETWORK
pub const DEFAULT_SERVICES: u64 = 1;
pub const DEFAULT_CLIENT_NAME: &str = "/btcnet-rust:0.1.0/";

/// Settings for the local node, read from the `network` table of a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub version: i32,
    pub services: u64,
    pub client_name: String,
    pub known_height: i32,
    pub external_ip: Option<IpAddr>,
    /// `host:port` pairs handed to the transport on launch.
    pub seeds: Vec<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            version: DEFAULT_PROTOCOL_VERSION,
            services: DEFAULT_SERVICES,
            client_name: String::from(DEFAULT_CLIENT_NAME),
            known_height: 0,
            external_ip: None,
            seeds: vec![],
        }
    }
}

impl NetworkSettings {
    /// Missing keys fall back to their defaults one by one.
    pub fn from_config(settings: &Config) -> NetworkSettings {
        let defaults = NetworkSettings::default();
        NetworkSettings {
            version: match settings.get::<i32>("network.version") {
                Ok(version) => version,
                Err(_) => defaults.version,
            },
            services: match settings.get::<u64>("network.services") {
                Ok(services) => services,
                Err(_) => defaults.services,
            },
            client_name: match settings.get::<String>("network.client_name") {
                Ok(client_name) => client_name,
                Err(_) => defaults.client_name,
            },
            known_height: match settings.get::<i32>("network.known_height") {
                Ok(known_height) => known_height,
                Err(_) => defaults.known_height,
            },
            external_ip: match settings.get::<String>("network.external_ip") {
                Ok(external_ip) => external_ip.parse::<IpAddr>().ok(),
                Err(_) => defaults.external_ip,
            },
            seeds: match settings.get::<Vec<String>>("network.seeds") {
                Ok(seeds) => seeds,
                Err(_) => defaults.seeds,
            },
        }
    }

    /// Reads `name` with any extension the config crate understands.
    pub fn load(name: &str) -> crate::Result<NetworkSettings> {
        let mut settings = Config::default();
        settings.merge(config::File::with_name(name))?;
        Ok(NetworkSettings::from_config(&settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    #[test]
    fn test_defaults() {
        let settings = NetworkSettings::default();
        assert_eq!(settings.version, 70000);
        assert_eq!(settings.services, 1);
        assert_eq!(settings.known_height, 0);
        assert_eq!(settings.external_ip, None);
    }

    #[test]
    fn test_from_config_overrides_present_keys() {
        let mut config = Config::default();
        config
            .merge(File::from_str(
                r#"
                [network]
                version = 70001
                client_name = "/test:1.0/"
                external_ip = "183.141.116.79"
                seeds = ["127.0.0.1:8333"]
                "#,
                FileFormat::Toml,
            ))
            .unwrap();

        let settings = NetworkSettings::from_config(&config);
        assert_eq!(settings.version, 70001);
        assert_eq!(settings.services, 1);
        assert_eq!(settings.client_name, "/test:1.0/");
        assert_eq!(settings.external_ip, Some("183.141.116.79".parse().unwrap()));
        assert_eq!(settings.seeds, vec!["127.0.0.1:8333".to_string()]);
    }

    #[test]
    fn test_unparseable_external_ip_is_ignored() {
        let mut config = Config::default();
        config
            .merge(File::from_str(
                "[network]\nexternal_ip = \"not-an-ip\"\n",
                FileFormat::Toml,
            ))
            .unwrap();
        assert_eq!(NetworkSettings::from_config(&config).external_ip, None);
    }
}
