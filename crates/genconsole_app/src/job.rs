use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use genconsole_core::{GenerationTarget, SessionKey};
use genconsole_engine::{AdditionalInfo, FilePart};

use crate::cli::GenerateArgs;

/// Everything needed to start one generation session.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub session_key: SessionKey,
    pub target: GenerationTarget,
    pub additional_info: Option<AdditionalInfo>,
}

impl GenerationJob {
    pub fn from_args(args: &GenerateArgs) -> Result<Self> {
        let resource = args.resource.trim();
        let project_id = args.project_id.trim();
        if resource.is_empty() || project_id.is_empty() {
            bail!("both --resource and --project are required");
        }

        let session_key = args
            .session
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(resource)
            .to_string();

        let mut target = GenerationTarget::new(resource, project_id);
        target.query = args.query.clone();

        Ok(Self {
            session_key,
            target,
            additional_info: load_additional_info(args)?,
        })
    }
}

fn load_additional_info(args: &GenerateArgs) -> Result<Option<AdditionalInfo>> {
    if args.info_json.is_none() && args.files.is_empty() {
        return Ok(None);
    }

    let json = match &args.info_json {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading additional info from {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing additional info in {}", path.display()))?
        }
        None => serde_json::Value::Object(Default::default()),
    };

    let files = args
        .files
        .iter()
        .map(|(field, path)| load_file_part(field, Path::new(path)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(AdditionalInfo { json, files }))
}

fn load_file_part(field: &str, path: &Path) -> Result<FilePart> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| field.to_string());
    Ok(FilePart {
        field: field.to_string(),
        mime: mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string()),
        file_name,
        bytes,
    })
}
