use std::path::{Path, PathBuf};

use tracing::warn;

use lw_platform::Credential;

use crate::types::CredentialProfile;

/// Scan `dir` for `{name}.session` + `{name}.json` pairs. A pair is valid
/// iff both files exist and the JSON parses with the required fields
///. Invalid pairs are logged and skipped, never fatal to the
/// caller.
pub fn discover_credentials(dir: &Path) -> std::io::Result<Vec<Credential>> {
    let mut found = Vec::new();
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "session credential directory does not exist");
        return Ok(found);
    }

    let mut stems = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("session") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
    }

    for name in stems {
        let session_path: PathBuf = dir.join(format!("{name}.session"));
        let json_path = dir.join(format!("{name}.json"));

        if !json_path.is_file() {
            warn!(name = %name, "session file has no matching .json sidecar, skipping");
            continue;
        }

        let raw = match std::fs::read_to_string(&json_path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(name = %name, error = %e, "failed to read credential sidecar, skipping");
                continue;
            }
        };

        let profile: CredentialProfile = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!(name = %name, error = %e, "malformed credential sidecar, skipping");
                continue;
            }
        };

        found.push(Credential {
            name: name.clone(),
            app_id: profile.app_id,
            app_hash: profile.app_hash,
            phone: profile.phone,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            session_path,
        });
    }

    Ok(found)
}
