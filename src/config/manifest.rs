//! Compose 部署清單 (docker-compose.yml) 的解析與驗證。
//!
//! 只處理清單本身：服務宣告、連接埠、環境檔、依賴順序與掛載。
//! 建置映像與啟動容器交給外部的 orchestrator。

use crate::utils::env::substitute_env_vars;
use crate::utils::error::{Result, StockError};
use crate::utils::validation::Validate;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,
    pub services: Services,
}

/// 服務表，保留宣告順序並拒絕重複名稱
#[derive(Debug, Clone, Default)]
pub struct Services(Vec<(String, ServiceSpec)>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<EnvFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<DependsOn>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildSpec {
    Context(String),
    Detailed {
        context: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dockerfile: Option<String>,
    },
}

impl BuildSpec {
    pub fn context(&self) -> &str {
        match self {
            BuildSpec::Context(context) => context,
            BuildSpec::Detailed { context, .. } => context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvFile {
    Single(String),
    Multiple(Vec<String>),
}

impl EnvFile {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            EnvFile::Single(path) => vec![path.as_str()],
            EnvFile::Multiple(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

/// `depends_on` 可寫成清單或帶 condition 的 map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    List(Vec<String>),
    Conditions(BTreeMap<String, DependencyCondition>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl DependsOn {
    pub fn names(&self) -> Vec<&str> {
        match self {
            DependsOn::List(names) => names.iter().map(String::as_str).collect(),
            DependsOn::Conditions(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Environment {
    Map(BTreeMap<String, serde_yaml::Value>),
    List(Vec<String>),
}

impl Environment {
    pub fn to_map(&self) -> BTreeMap<String, String> {
        match self {
            Environment::Map(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), yaml_scalar_to_string(v).unwrap_or_default()))
                .collect(),
            Environment::List(list) => list
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// `[host_ip:][host:]container[/protocol]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub host_ip: Option<String>,
    pub host: Option<u16>,
    pub container: u16,
    pub protocol: Protocol,
}

impl FromStr for PortBinding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (spec, protocol) = match s.rsplit_once('/') {
            Some((spec, "tcp")) => (spec, Protocol::Tcp),
            Some((spec, "udp")) => (spec, Protocol::Udp),
            Some((_, other)) => return Err(format!("unsupported protocol '{}'", other)),
            None => (s, Protocol::Tcp),
        };

        let mut parts = spec.rsplitn(3, ':');
        let container = parts.next().unwrap_or_default();
        let host = parts.next();
        let host_ip = parts
            .next()
            .map(|ip| ip.trim_start_matches('[').trim_end_matches(']').to_string());

        Ok(PortBinding {
            host_ip,
            host: match host {
                Some("") | None => None,
                Some(h) => Some(parse_port(h)?),
            },
            container: parse_port(container)?,
            protocol,
        })
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ip) = &self.host_ip {
            write!(f, "{}:", ip)?;
        }
        if let Some(host) = self.host {
            write!(f, "{}:", host)?;
        }
        write!(f, "{}/{}", self.container, self.protocol)
    }
}

fn parse_port(raw: &str) -> std::result::Result<u16, String> {
    if raw.contains('-') {
        return Err(format!("port ranges are not supported: '{}'", raw));
    }
    match raw.parse::<u16>() {
        Ok(0) => Err("port 0 is not allowed".to_string()),
        Ok(port) => Ok(port),
        Err(_) => Err(format!("invalid port '{}'", raw)),
    }
}

/// `source:target[:mode]`，只有 target 時為匿名 volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: Option<String>,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    /// 來源是主機路徑（相對或絕對）時才算 bind mount
    pub fn is_bind(&self) -> bool {
        self.source
            .as_deref()
            .map(|s| s.starts_with('.') || s.starts_with('/') || s.starts_with('~'))
            .unwrap_or(false)
    }
}

impl FromStr for VolumeMount {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (source, target, mode) = match parts.as_slice() {
            [target] => (None, *target, None),
            [source, target] => (Some(*source), *target, None),
            [source, target, mode] => (Some(*source), *target, Some(*mode)),
            _ => return Err(format!("invalid volume '{}'", s)),
        };

        if target.is_empty() || !target.starts_with('/') {
            return Err(format!("volume target must be an absolute path: '{}'", s));
        }
        if let Some(source) = source {
            if source.is_empty() {
                return Err(format!("volume source is empty: '{}'", s));
            }
        }

        Ok(VolumeMount {
            source: source.map(str::to_string),
            target: target.to_string(),
            read_only: mode
                .map(|m| m.split(',').any(|flag| flag == "ro"))
                .unwrap_or(false),
        })
    }
}

impl Manifest {
    /// 從 YAML 檔案載入清單
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Reading manifest from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// 從 YAML 字串解析清單
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;
        let manifest: Manifest = serde_yaml::from_str(&processed_content)?;
        Ok(manifest)
    }

    pub fn services(&self) -> impl Iterator<Item = (&str, &ServiceSpec)> {
        self.services.iter()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|(name, _)| name).collect()
    }

    /// 所有服務都引用到的環境檔
    pub fn shared_env_files(&self) -> Vec<&str> {
        let mut services = self.services.iter();
        let Some((_, first)) = services.next() else {
            return Vec::new();
        };

        let mut shared: Vec<&str> = first.env_files();
        for (_, spec) in services {
            let files = spec.env_files();
            shared.retain(|f| files.contains(f));
        }
        shared
    }

    /// 每個服務解析後的連接埠，解析失敗的項目略過（由 validate 報告）
    pub fn published_ports(&self) -> Vec<(&str, PortBinding)> {
        self.services
            .iter()
            .flat_map(|(name, spec)| {
                spec.ports
                    .iter()
                    .filter_map(move |raw| raw.parse::<PortBinding>().ok().map(|p| (name, p)))
            })
            .collect()
    }

    /// 直接依賴 `name` 的服務
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, spec)| spec.dependencies().contains(&name))
            .map(|(dependent, _)| dependent)
            .collect()
    }

    /// 依賴排序後的啟動順序；沒有依賴關係時按宣告順序
    pub fn start_order(&self) -> Result<Vec<&str>> {
        for (name, spec) in self.services.iter() {
            self.validate_dependency_targets(name, spec)?;
        }
        self.validate_dependencies()?;

        let mut started: Vec<&str> = Vec::with_capacity(self.services.len());
        let mut placed: HashSet<&str> = HashSet::new();

        while started.len() < self.services.len() {
            let next = self.services.iter().find(|(name, spec)| {
                !placed.contains(name) && spec.dependencies().iter().all(|d| placed.contains(d))
            });

            match next {
                Some((name, _)) => {
                    placed.insert(name);
                    started.push(name);
                }
                None => {
                    return Err(StockError::manifest(
                        "services",
                        "Circular dependency detected in depends_on",
                    ))
                }
            }
        }

        Ok(started)
    }

    /// 驗證清單的合理性
    pub fn validate_manifest(&self) -> Result<()> {
        Self::validate_version(&self.version)?;

        if self.services.is_empty() {
            return Err(StockError::manifest("services", "No services defined"));
        }

        for (name, spec) in self.services.iter() {
            self.validate_service(name, spec)?;
        }

        self.validate_port_conflicts()?;
        self.validate_dependencies()?;

        Ok(())
    }

    fn validate_version(version: &str) -> Result<()> {
        if version.is_empty() || version.starts_with('2') || version.starts_with('3') {
            Ok(())
        } else {
            Err(StockError::manifest(
                "version",
                format!("Unsupported compose version '{}'", version),
            ))
        }
    }

    fn validate_service(&self, name: &str, spec: &ServiceSpec) -> Result<()> {
        if name.trim().is_empty() {
            return Err(StockError::manifest(name, "Service name cannot be empty"));
        }

        match (&spec.build, &spec.image) {
            (None, None) => {
                return Err(StockError::manifest(name, "Service needs 'build' or 'image'"))
            }
            (Some(build), _) if build.context().trim().is_empty() => {
                return Err(StockError::manifest(name, "build.context cannot be empty"))
            }
            _ => {}
        }

        for raw in &spec.ports {
            raw.parse::<PortBinding>()
                .map_err(|reason| StockError::manifest(name, format!("ports: {}", reason)))?;
        }

        for raw in &spec.volumes {
            raw.parse::<VolumeMount>()
                .map_err(|reason| StockError::manifest(name, format!("volumes: {}", reason)))?;
        }

        for path in spec.env_files() {
            if path.trim().is_empty() {
                return Err(StockError::manifest(name, "env_file path cannot be empty"));
            }
        }

        self.validate_dependency_targets(name, spec)
    }

    /// 驗證依賴的服務存在且不是自己
    fn validate_dependency_targets(&self, name: &str, spec: &ServiceSpec) -> Result<()> {
        for dep in spec.dependencies() {
            if dep == name {
                return Err(StockError::manifest(name, "Service cannot depend on itself"));
            }
            if self.services.get(dep).is_none() {
                return Err(StockError::manifest(
                    name,
                    format!("Dependency service '{}' not found", dep),
                ));
            }
        }

        Ok(())
    }

    fn validate_port_conflicts(&self) -> Result<()> {
        // 未指定、0.0.0.0 或 :: 的 host ip 佔用所有介面
        let published = self.published_ports();
        let mut bound: Vec<(Option<&str>, u16, Protocol, &str)> = Vec::new();

        for &(service, ref port) in &published {
            let Some(host) = port.host else {
                continue;
            };
            let ip = port.host_ip.as_deref().filter(|ip| !is_wildcard_ip(ip));

            let owner = bound.iter().find(|(other_ip, other_host, other_proto, _)| {
                *other_host == host
                    && *other_proto == port.protocol
                    && (ip.is_none() || other_ip.is_none() || *other_ip == ip)
            });
            if let Some((_, _, _, owner)) = owner {
                return Err(StockError::manifest(
                    service,
                    format!("Host port {}/{} is already published by '{}'", host, port.protocol, owner),
                ));
            }

            bound.push((ip, host, port.protocol, service));
        }

        Ok(())
    }

    fn validate_dependencies(&self) -> Result<()> {
        // 檢查循環依賴
        let mut visited = HashSet::new();
        let mut rec_stack = Vec::new();

        for (name, _) in self.services.iter() {
            if !visited.contains(name) {
                if let Some(cycle) = self.find_cycle(name, &mut visited, &mut rec_stack) {
                    return Err(StockError::manifest(
                        name,
                        format!("Circular dependency detected: {}", cycle.join(" -> ")),
                    ));
                }
            }
        }

        Ok(())
    }

    fn find_cycle<'a>(
        &'a self,
        service: &'a str,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut Vec<&'a str>,
    ) -> Option<Vec<&'a str>> {
        visited.insert(service);
        rec_stack.push(service);

        if let Some(spec) = self.services.get(service) {
            for dep in spec.dependencies() {
                if let Some(pos) = rec_stack.iter().position(|s| *s == dep) {
                    let mut cycle = rec_stack[pos..].to_vec();
                    cycle.push(dep);
                    return Some(cycle);
                }
                if !visited.contains(dep) {
                    if let Some(cycle) = self.find_cycle(dep, visited, rec_stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        rec_stack.pop();
        None
    }

    /// 檢查 env_file 是否存在（相對於清單所在目錄）
    pub fn check_env_files<P: AsRef<Path>>(&self, base_dir: P) -> Result<()> {
        let base_dir = base_dir.as_ref();
        let mut missing = Vec::new();

        for (name, spec) in self.services.iter() {
            for file in spec.env_files() {
                let path = resolve(base_dir, file);
                if !path.is_file() {
                    tracing::warn!("Service '{}' env_file not found: {}", name, path.display());
                    missing.push(format!("{} ({})", file, name));
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StockError::manifest(
                "env_file",
                format!("Missing environment files: {}", missing.join(", ")),
            ))
        }
    }
}

fn is_wildcard_ip(ip: &str) -> bool {
    matches!(ip, "0.0.0.0" | "::" | "[::]")
}

fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

impl Validate for Manifest {
    fn validate(&self) -> Result<()> {
        self.validate_manifest()
    }
}

impl ServiceSpec {
    pub fn dependencies(&self) -> Vec<&str> {
        self.depends_on
            .as_ref()
            .map(DependsOn::names)
            .unwrap_or_default()
    }

    pub fn env_files(&self) -> Vec<&str> {
        self.env_file.as_ref().map(EnvFile::paths).unwrap_or_default()
    }

    pub fn port_bindings(&self) -> Result<Vec<PortBinding>> {
        self.ports
            .iter()
            .map(|raw| {
                raw.parse()
                    .map_err(|reason| StockError::manifest("ports", reason))
            })
            .collect()
    }

    pub fn bind_mounts(&self) -> Result<Vec<VolumeMount>> {
        let mounts: Vec<VolumeMount> = self
            .volumes
            .iter()
            .map(|raw| {
                raw.parse()
                    .map_err(|reason| StockError::manifest("volumes", reason))
            })
            .collect::<Result<_>>()?;
        Ok(mounts.into_iter().filter(VolumeMount::is_bind).collect())
    }
}

impl Services {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceSpec)> {
        self.0.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn get(&self, name: &str) -> Option<&ServiceSpec> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, spec)| spec)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Services {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, spec) in &self.0 {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Services {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ServicesVisitor;

        impl<'de> Visitor<'de> for ServicesVisitor {
            type Value = Services;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of service name to service definition")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Services, E> {
                Ok(Services::default())
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Services, A::Error> {
                let mut entries: Vec<(String, ServiceSpec)> = Vec::new();
                while let Some(name) = access.next_key::<String>()? {
                    if entries.iter().any(|(existing, _)| *existing == name) {
                        return Err(de::Error::custom(format!(
                            "duplicate service name '{}'",
                            name
                        )));
                    }
                    // `service: ~` 視為空定義，交給 validate 報告
                    let spec = access
                        .next_value::<Option<ServiceSpec>>()?
                        .unwrap_or_default();
                    entries.push((name, spec));
                }
                Ok(Services(entries))
            }
        }

        deserializer.deserialize_any(ServicesVisitor)
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = serde_yaml::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(String::new());
    }
    yaml_scalar_to_string(&value).ok_or_else(|| de::Error::custom("expected a string or number"))
}

fn scalar_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    let values = Option::<Vec<serde_yaml::Value>>::deserialize(deserializer)?.unwrap_or_default();
    values
        .iter()
        .map(|v| {
            yaml_scalar_to_string(v).ok_or_else(|| de::Error::custom("expected a string or number"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const SHIPPED: &str = include_str!("../../deploy/docker-compose.yml");

    #[test]
    fn test_shipped_manifest_declares_two_services() {
        let manifest = Manifest::from_yaml_str(SHIPPED).unwrap();
        manifest.validate().unwrap();

        assert_eq!(manifest.service_names(), vec!["mcp-server", "streamlit-app"]);
        assert_eq!(
            manifest.service("mcp-server").unwrap().build.as_ref().unwrap().context(),
            "./mcp-server"
        );
    }

    #[test]
    fn test_shipped_manifest_dependency_and_order() {
        let manifest = Manifest::from_yaml_str(SHIPPED).unwrap();
        let app = manifest.service("streamlit-app").unwrap();
        assert_eq!(app.dependencies(), vec!["mcp-server"]);
        assert_eq!(manifest.dependents_of("mcp-server"), vec!["streamlit-app"]);
        assert_eq!(manifest.start_order().unwrap(), vec!["mcp-server", "streamlit-app"]);
    }

    #[test]
    fn test_shipped_manifest_shares_env_file() {
        let manifest = Manifest::from_yaml_str(SHIPPED).unwrap();
        assert_eq!(manifest.shared_env_files(), vec![".env"]);
        for (_, spec) in manifest.services() {
            assert_eq!(spec.env_files(), vec![".env"]);
        }
    }

    #[test]
    fn test_shipped_manifest_ports_are_mapped_once() {
        let manifest = Manifest::from_yaml_str(SHIPPED).unwrap();
        let ports = manifest.published_ports();

        for expected in [8000u16, 8501] {
            let matching: Vec<_> = ports.iter().filter(|(_, p)| p.host == Some(expected)).collect();
            assert_eq!(matching.len(), 1, "host port {} mapped once", expected);
            assert_eq!(matching[0].1.container, expected);
        }
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_shipped_manifest_bind_mounts() {
        let manifest = Manifest::from_yaml_str(SHIPPED).unwrap();
        let mounts = manifest.service("mcp-server").unwrap().bind_mounts().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].source.as_deref(), Some("./mcp-server"));
        assert_eq!(mounts[0].target, "/app");
        assert!(!mounts[0].read_only);
    }

    #[test]
    fn test_duplicate_service_names_rejected() {
        let yaml = r#"
services:
  api:
    image: api
  api:
    image: other
"#;
        assert!(Manifest::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let yaml = r#"
version: "3"
services:
  web:
    image: web
    depends_on: [db]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("Dependency service 'db' not found"));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let yaml = r#"
services:
  web:
    image: web
    depends_on: [web]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_circular_dependency_detection() {
        let yaml = r#"
services:
  a:
    image: a
    depends_on: [b]
  b:
    image: b
    depends_on:
      c:
        condition: service_started
  c:
    image: c
    depends_on: [a]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("a -> b -> c -> a"), "{}", err);
        assert!(manifest.start_order().is_err());
    }

    #[test]
    fn test_start_order_respects_long_form_depends_on() {
        let yaml = r#"
version: 3.8
services:
  app:
    image: app
    depends_on:
      db:
        condition: service_healthy
      cache:
        condition: service_started
  cache:
    image: redis
  db:
    image: postgres
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.version, "3.8");
        manifest.validate().unwrap();
        assert_eq!(manifest.start_order().unwrap(), vec!["cache", "db", "app"]);
    }

    #[test]
    fn test_host_port_conflict_rejected() {
        let yaml = r#"
services:
  a:
    image: a
    ports: ["8000:8000"]
  b:
    image: b
    ports: ["8000:9000"]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("already published by 'a'"));
    }

    #[test]
    fn test_same_port_different_protocol_or_ip_allowed() {
        let yaml = r#"
services:
  a:
    image: a
    ports: ["53:53/udp", "127.0.0.1:8080:80"]
  b:
    image: b
    ports: ["53:53", "127.0.0.2:8080:80", 9000]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        manifest.validate().unwrap();
    }

    #[test]
    fn test_wildcard_port_clashes_with_specific_ip() {
        let yaml = r#"
services:
  a:
    image: a
    ports: ["8000:8000"]
  b:
    image: b
    ports: ["127.0.0.1:8000:9000"]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("already published by 'a'"));

        let yaml = r#"
services:
  a:
    image: a
    ports: ["127.0.0.1:8000:8000"]
  b:
    image: b
    ports: ["0.0.0.0:8000:9000"]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_start_order_reports_dangling_dependency() {
        let yaml = r#"
services:
  web:
    image: web
    depends_on: [db]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        let err = manifest.start_order().unwrap_err();
        assert!(err.to_string().contains("Dependency service 'db' not found"));
        assert!(!err.to_string().contains("Circular"));
    }

    #[test]
    fn test_service_without_build_or_image_rejected() {
        let yaml = r#"
services:
  worker:
    ports: ["9000:9000"]
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let yaml = r#"
version: "1"
services:
  web:
    image: web
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_port_binding_parsing() {
        let p: PortBinding = "127.0.0.1:8000:80/udp".parse().unwrap();
        assert_eq!(p.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(p.host, Some(8000));
        assert_eq!(p.container, 80);
        assert_eq!(p.protocol, Protocol::Udp);
        assert_eq!(p.to_string(), "127.0.0.1:8000:80/udp");

        let p: PortBinding = "8501".parse().unwrap();
        assert_eq!(p.host, None);
        assert_eq!(p.container, 8501);

        assert!("70000:80".parse::<PortBinding>().is_err());
        assert!("3000-3005:3000-3005".parse::<PortBinding>().is_err());
        assert!("80:80/sctp".parse::<PortBinding>().is_err());
    }

    #[test]
    fn test_volume_parsing() {
        let v: VolumeMount = "./src:/app:ro".parse().unwrap();
        assert!(v.is_bind());
        assert!(v.read_only);

        let v: VolumeMount = "data:/var/lib/data".parse().unwrap();
        assert!(!v.is_bind());

        let v: VolumeMount = "/cache".parse().unwrap();
        assert_eq!(v.source, None);

        assert!("./src:relative".parse::<VolumeMount>().is_err());
    }

    #[test]
    fn test_environment_forms() {
        let yaml = r#"
services:
  a:
    image: a
    environment:
      PORT: 8000
      DEBUG: true
  b:
    image: b
    environment:
      - MCP_SERVER_URL=http://mcp-server:8000
"#;
        let manifest = Manifest::from_yaml_str(yaml).unwrap();
        let a = manifest.service("a").unwrap().environment.as_ref().unwrap().to_map();
        assert_eq!(a.get("PORT").map(String::as_str), Some("8000"));
        assert_eq!(a.get("DEBUG").map(String::as_str), Some("true"));
        let b = manifest.service("b").unwrap().environment.as_ref().unwrap().to_map();
        assert_eq!(
            b.get("MCP_SERVER_URL").map(String::as_str),
            Some("http://mcp-server:8000")
        );
    }

    #[test]
    fn test_check_env_files() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::from_yaml_str(SHIPPED).unwrap();
        assert!(manifest.check_env_files(dir.path()).is_err());

        let mut env = std::fs::File::create(dir.path().join(".env")).unwrap();
        writeln!(env, "FMP_API_KEY=demo").unwrap();
        manifest.check_env_files(dir.path()).unwrap();
    }

    #[test]
    fn test_manifest_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docker-compose.yml");
        std::fs::write(&path, SHIPPED).unwrap();
        let manifest = Manifest::from_file(&path).unwrap();
        assert_eq!(manifest.services.len(), 2);
    }
}
