// Compose manifest model.
//
// Only what the scanner needs is parsed into structs; path-carrying fields are modelled as one
// variant type per accepted YAML shape and otherwise left as raw YAML so a rewritten manifest
// keeps every key the CLI understands.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;

use super::translate::PathRewriter;
use crate::error::{Error, Result};

/// Manifest filenames, in lookup priority order.
pub const MANIFEST_FILES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDecl {
    pub name: String,
    pub image: Option<String>,
    pub has_build: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Top-level `name`, which overrides the directory-derived project name.
    pub name: Option<String>,
    /// Declaration order.
    pub services: Vec<ServiceDecl>,
}

#[derive(Deserialize)]
struct ManifestDoc {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    services: Option<Mapping>,
}

impl Manifest {
    pub fn parse(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut value: Value = serde_yaml::from_str(text)?;
        value.apply_merge()?;
        let doc: ManifestDoc = serde_yaml::from_value(value)?;
        let services = doc
            .services
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, body)| {
                let name = key.as_str()?.to_string();
                let body = body.as_mapping();
                Some(ServiceDecl {
                    name,
                    image: body
                        .and_then(|b| b.get("image"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    has_build: body.is_some_and(|b| b.contains_key("build")),
                })
            })
            .collect();
        Ok(Self {
            name: doc.name.filter(|n| !n.is_empty()),
            services,
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::parse(&text).map_err(|source| Error::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn rewrite_key(map: &mut Mapping, key: &str, f: impl FnOnce(&str) -> String) {
    if let Some(Value::String(s)) = map.get_mut(key) {
        *s = f(s);
    }
}

/// Contexts the CLI fetches itself (git, URLs) are never filesystem paths.
fn is_remote_context(context: &str) -> bool {
    context.contains("://") || context.starts_with("git@") || context.starts_with("github.com/")
}

/// `build:` as a bare context string or the long form with `context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildSpec {
    Context(String),
    Detailed(Mapping),
}

impl BuildSpec {
    /// `dockerfile` stays relative to the context; only the context moves.
    pub fn rewrite(self, paths: &PathRewriter) -> Self {
        let to_host = |c: &str| {
            if is_remote_context(c) {
                c.to_string()
            } else {
                paths.to_host(c)
            }
        };
        match self {
            BuildSpec::Context(c) => BuildSpec::Context(to_host(&c)),
            BuildSpec::Detailed(mut m) => {
                rewrite_key(&mut m, "context", to_host);
                BuildSpec::Detailed(m)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvFileEntry {
    Path(String),
    /// `{path, required}`
    Detailed(Mapping),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvFileSpec {
    Single(String),
    List(Vec<EnvFileEntry>),
}

impl EnvFileSpec {
    /// The CLI reads env files itself, so they stay in the local namespace.
    pub fn rewrite(self, paths: &PathRewriter) -> Self {
        match self {
            EnvFileSpec::Single(p) => EnvFileSpec::Single(paths.to_local(&p)),
            EnvFileSpec::List(entries) => EnvFileSpec::List(
                entries
                    .into_iter()
                    .map(|e| match e {
                        EnvFileEntry::Path(p) => EnvFileEntry::Path(paths.to_local(&p)),
                        EnvFileEntry::Detailed(mut m) => {
                            rewrite_key(&mut m, "path", |p| paths.to_local(p));
                            EnvFileEntry::Detailed(m)
                        }
                    })
                    .collect(),
            ),
        }
    }
}

/// One entry of a service's `volumes:` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeSpec {
    /// `source:target[:mode]`, or a bare container path for an anonymous volume.
    Short(String),
    /// `{type, source, target, ...}`
    Long(Mapping),
}

/// Bind sources are paths; anything without a separator names a volume. `~` and
/// interpolated sources are resolved by the CLI.
fn is_bind_source(source: &str) -> bool {
    !source.starts_with('~')
        && !source.starts_with('$')
        && (source.starts_with('.') || source.contains('/'))
}

impl VolumeSpec {
    pub fn rewrite(self, paths: &PathRewriter) -> Self {
        match self {
            VolumeSpec::Short(spec) => {
                let Some((source, rest)) = spec.split_once(':') else {
                    return VolumeSpec::Short(spec);
                };
                if !is_bind_source(source) {
                    return VolumeSpec::Short(spec);
                }
                VolumeSpec::Short(format!("{}:{}", paths.to_host(source), rest))
            }
            VolumeSpec::Long(mut m) => {
                let is_bind = m.get("type").and_then(Value::as_str) == Some("bind");
                if is_bind {
                    rewrite_key(&mut m, "source", |s| {
                        if is_bind_source(s) || Path::new(s).is_absolute() {
                            paths.to_host(s)
                        } else {
                            s.to_string()
                        }
                    });
                }
                VolumeSpec::Long(m)
            }
        }
    }
}

/// `extends:` as a same-file service name or `{service, file}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtendsSpec {
    Service(String),
    Detailed(Mapping),
}

impl ExtendsSpec {
    pub fn rewrite(self, paths: &PathRewriter) -> Self {
        match self {
            ExtendsSpec::Service(s) => ExtendsSpec::Service(s),
            ExtendsSpec::Detailed(mut m) => {
                rewrite_key(&mut m, "file", |f| paths.to_host(f));
                ExtendsSpec::Detailed(m)
            }
        }
    }
}

/// Top-level `configs:` / `secrets:` entry; only file-backed ones carry a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileObjectSpec(pub Mapping);

impl FileObjectSpec {
    pub fn rewrite(mut self, paths: &PathRewriter) -> Self {
        rewrite_key(&mut self.0, "file", |f| paths.to_host(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_declaration_order() {
        let m = Manifest::parse(
            "name: shop\nservices:\n  web:\n    image: nginx\n  api:\n    build: ./api\n  worker:\n",
        )
        .unwrap();
        assert_eq!(m.name.as_deref(), Some("shop"));
        let names: Vec<&str> = m.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["web", "api", "worker"]);
        assert_eq!(m.services[0].image.as_deref(), Some("nginx"));
        assert!(m.services[1].has_build);
        assert!(!m.services[2].has_build && m.services[2].image.is_none());
    }

    #[test]
    fn merge_keys_are_applied() {
        let m = Manifest::parse(
            "x-app: &app\n  image: shop/app:2\n  build: .\nservices:\n  api:\n    <<: *app\n",
        )
        .unwrap();
        assert_eq!(m.services[0].image.as_deref(), Some("shop/app:2"));
        assert!(m.services[0].has_build);
    }

    #[test]
    fn empty_documents() {
        assert!(Manifest::parse("").unwrap().services.is_empty());
        assert!(Manifest::parse("services:\n").unwrap().services.is_empty());
        assert!(Manifest::parse("version: '3'\n").unwrap().services.is_empty());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(Manifest::parse("services: [web\n").is_err());
        assert!(Manifest::parse("services:\n  - web\n").is_err());
    }

    #[test]
    fn variant_shapes() {
        let b: BuildSpec = serde_yaml::from_str("./app").unwrap();
        assert_eq!(b, BuildSpec::Context("./app".into()));
        let b: BuildSpec = serde_yaml::from_str("{context: ., dockerfile: Dockerfile.dev}").unwrap();
        assert!(matches!(b, BuildSpec::Detailed(_)));

        let e: EnvFileSpec = serde_yaml::from_str("[.env, {path: ./extra.env, required: false}]").unwrap();
        let EnvFileSpec::List(entries) = e else {
            panic!("expected list");
        };
        assert!(matches!(entries[0], EnvFileEntry::Path(_)));
        assert!(matches!(entries[1], EnvFileEntry::Detailed(_)));

        let v: VolumeSpec = serde_yaml::from_str("{type: bind, source: ./x, target: /x}").unwrap();
        assert!(matches!(v, VolumeSpec::Long(_)));
    }

    #[test]
    fn bind_source_detection() {
        assert!(is_bind_source("./data"));
        assert!(is_bind_source("."));
        assert!(is_bind_source("/etc/ssl/certs"));
        assert!(is_bind_source("conf/nginx"));
        assert!(!is_bind_source("pgdata"));
        assert!(!is_bind_source("~/data"));
        assert!(!is_bind_source("${DATA_DIR}/x"));
    }

    #[test]
    fn remote_contexts() {
        assert!(is_remote_context("https://github.com/a/b.git#main"));
        assert!(is_remote_context("git@github.com:a/b.git"));
        assert!(!is_remote_context("./app"));
    }
}
