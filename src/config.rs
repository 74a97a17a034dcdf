use serde::Deserialize;

use crate::bids::BIDS_DATATYPES;

#[derive(Debug, Clone, Deserialize)]
pub struct XnatConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BidsConfig {
    pub subject_marker: String,
    pub session_marker: String,
    pub datatypes: Vec<String>,
    pub mri_suffixes: Vec<String>,
    pub meg_suffixes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl BidsConfig {
    pub fn is_datatype(&self, name: &str) -> bool {
        self.datatypes.iter().any(|d| d == name)
    }

    pub fn is_mri_file(&self, filename: &str) -> bool {
        self.mri_suffixes.iter().any(|s| filename.ends_with(s.as_str()))
    }

    pub fn is_meg_file(&self, filename: &str) -> bool {
        self.meg_suffixes.iter().any(|s| filename.ends_with(s.as_str()))
    }
}

impl Default for BidsConfig {
    fn default() -> Self {
        // Mirror defaults from config/default.toml
        Self {
            subject_marker: "sub".into(),
            session_marker: "ses".into(),
            datatypes: vec!["anat".into(), "meg".into(), "dwi".into()],
            mri_suffixes: vec![".nii".into(), ".nii.gz".into()],
            meg_suffixes: vec![".con".into(), ".mrk".into()],
            excludes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UploadConfig {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub dir: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub xnat: XnatConfig,
    pub bids: BidsConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: bids-uploader.toml (in CWD)
        .add_source(::config::File::with_name("bids-uploader").required(false));

    if let Ok(custom_path) = std::env::var("BIDS_UPLOADER_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(
        ::config::Environment::with_prefix("BIDS_UPLOADER")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("bids.datatypes")
            .with_list_parse_key("bids.mri_suffixes")
            .with_list_parse_key("bids.meg_suffixes")
            .with_list_parse_key("bids.excludes")
            .try_parsing(true),
    );

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // XNAT
    if cfg.xnat.url.trim().is_empty() {
        return Err(anyhow::anyhow!("xnat.url must not be empty"));
    }
    if cfg.xnat.timeout_secs == 0 {
        return Err(anyhow::anyhow!("xnat.timeout_secs must be > 0"));
    }

    // BIDS layout
    if cfg.bids.subject_marker.is_empty() {
        return Err(anyhow::anyhow!("bids.subject_marker must not be empty"));
    }
    if cfg.bids.session_marker.is_empty() {
        return Err(anyhow::anyhow!("bids.session_marker must not be empty"));
    }
    if cfg.bids.datatypes.is_empty() {
        return Err(anyhow::anyhow!("bids.datatypes must list at least one datatype"));
    }
    for d in &cfg.bids.datatypes {
        if !BIDS_DATATYPES.contains(&d.as_str()) {
            return Err(anyhow::anyhow!(
                "unknown BIDS datatype {:?} in bids.datatypes (expected one of {})",
                d,
                BIDS_DATATYPES.join(", ")
            ));
        }
    }
    crate::bids::build_excludes(&cfg.bids.excludes)?;

    Ok(())
}
