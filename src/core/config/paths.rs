use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let data_dir = discover_data_dir(&project_root);
        Self::with_dirs(project_root, data_dir)
    }

    pub fn with_dirs(project_root: PathBuf, data_dir: PathBuf) -> Self {
        let log_dir = data_dir.join("logs");
        let secrets_path = data_dir.join("secrets.yaml");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            data_dir,
            log_dir,
            secrets_path,
        }
    }

    /// Resolves a configured path: absolute paths pass through, relative ones
    /// are taken from the project root (where `assets/` and `config.yml` live).
    pub fn resolve(&self, raw: impl AsRef<Path>) -> PathBuf {
        let candidate = raw.as_ref();
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        self.project_root.join(candidate)
    }

    /// Resolves `raw` to a canonical existing path that lies under the project
    /// root, the data directory or one of `extra_roots`.
    pub fn resolve_confined(&self, raw: impl AsRef<Path>, extra_roots: &[PathBuf]) -> io::Result<PathBuf> {
        let target = fs::canonicalize(self.resolve(raw))?;
        let allowed = [&self.project_root, &self.data_dir]
            .into_iter()
            .chain(extra_roots)
            .filter_map(|root| fs::canonicalize(root).ok())
            .any(|root| target.starts_with(&root));

        if !allowed {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is outside the allowed directories", target.display()),
            ));
        }
        Ok(target)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("HELPERBOT_ROOT") {
        return PathBuf::from(root);
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if cwd.join("config.yml").exists() {
        return cwd;
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    cwd
}

fn discover_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("HELPERBOT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return project_root.join(".helperbot");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("helperbot")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
