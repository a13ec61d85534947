use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

pub const ENV_FILE: &str = ".env";
const ACCESS_TOKEN_KEY: &str = "MELI_ACCESS_TOKEN";
const REFRESH_TOKEN_KEY: &str = "MELI_REFRESH_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub portal: PortalConfig,
    #[serde(default)]
    pub webdriver: WebdriverConfig,
    #[serde(default)]
    pub meli: MeliConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    #[serde(default = "default_username_field")]
    pub username_field: String,
    #[serde(default = "default_cnpj_field")]
    pub cnpj_field: String,
    #[serde(default = "default_login_button")]
    pub login_button: String,
    #[serde(default = "default_category_selector")]
    pub category_selector: String,
    #[serde(default = "default_card_selector")]
    pub card_selector: String,
    #[serde(default = "default_title_selector")]
    pub title_selector: String,
    #[serde(default = "default_price_selector")]
    pub price_selector: String,
    #[serde(default = "default_brand_selector")]
    pub brand_selector: String,
    #[serde(default = "default_login_wait_ms")]
    pub login_wait_ms: u64,
    #[serde(default = "default_scroll_poll_ms")]
    pub scroll_poll_ms: u64,
    #[serde(default = "default_max_scroll_polls")]
    pub max_scroll_polls: u32,
    #[serde(default = "default_settle_polls")]
    pub settle_polls: u32,
    #[serde(default)]
    pub max_categories: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username_field: default_username_field(),
            cnpj_field: default_cnpj_field(),
            login_button: default_login_button(),
            category_selector: default_category_selector(),
            card_selector: default_card_selector(),
            title_selector: default_title_selector(),
            price_selector: default_price_selector(),
            brand_selector: default_brand_selector(),
            login_wait_ms: default_login_wait_ms(),
            scroll_poll_ms: default_scroll_poll_ms(),
            max_scroll_polls: default_max_scroll_polls(),
            settle_polls: default_settle_polls(),
            max_categories: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebdriverConfig {
    #[serde(default = "default_webdriver_url")]
    pub server_url: String,
    #[serde(default)]
    pub headless: bool,
}

impl Default for WebdriverConfig {
    fn default() -> Self {
        Self {
            server_url: default_webdriver_url(),
            headless: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MeliConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_site_id")]
    pub site_id: String,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_listing_type")]
    pub listing_type: String,
    #[serde(default = "default_buying_mode")]
    pub buying_mode: String,
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Portal category name (lowercased) -> marketplace category id.
    #[serde(default)]
    pub category_map: HashMap<String, String>,
}

impl Default for MeliConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            site_id: default_site_id(),
            default_category: default_category(),
            listing_type: default_listing_type(),
            buying_mode: default_buying_mode(),
            condition: default_condition(),
            currency: default_currency(),
            category_map: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    /// Minimum margin (marketplace price minus portal price, BRL) a product
    /// must clear before it is worth publishing.
    #[serde(default = "default_margin_threshold")]
    pub margin_threshold: f64,
    /// Flat amount added to the portal price to form the listing price.
    #[serde(default = "default_publish_markup")]
    pub publish_markup: f64,
    #[serde(default = "default_stock")]
    pub default_stock: u32,
    #[serde(default = "default_description")]
    pub default_description: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            margin_threshold: default_margin_threshold(),
            publish_markup: default_publish_markup(),
            default_stock: default_stock(),
            default_description: default_description(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_report_path")]
    pub output_path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: default_report_path(),
        }
    }
}

fn default_username_field() -> String {
    "P9998_USERNAME".to_string()
}

fn default_cnpj_field() -> String {
    "P9998_CNPJ".to_string()
}

fn default_login_button() -> String {
    "btnEntrar".to_string()
}

fn default_category_selector() -> String {
    "a[href*='categoria']".to_string()
}

fn default_card_selector() -> String {
    ".produto-card".to_string()
}

fn default_title_selector() -> String {
    ".titulo".to_string()
}

fn default_price_selector() -> String {
    ".preco".to_string()
}

fn default_brand_selector() -> String {
    ".marca".to_string()
}

fn default_login_wait_ms() -> u64 {
    10_000
}

fn default_scroll_poll_ms() -> u64 {
    1_500
}

fn default_max_scroll_polls() -> u32 {
    40
}

fn default_settle_polls() -> u32 {
    3
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_api_base() -> String {
    "https://api.mercadolibre.com".to_string()
}

fn default_site_id() -> String {
    "MLB".to_string()
}

fn default_category() -> String {
    "MLB3530".to_string()
}

fn default_listing_type() -> String {
    "gold_special".to_string()
}

fn default_buying_mode() -> String {
    "buy_it_now".to_string()
}

fn default_condition() -> String {
    "new".to_string()
}

fn default_currency() -> String {
    "BRL".to_string()
}

fn default_margin_threshold() -> f64 {
    20.0
}

fn default_publish_markup() -> f64 {
    30.0
}

fn default_stock() -> u32 {
    10
}

fn default_description() -> String {
    "Produto novo com nota fiscal. Envio imediato.".to_string()
}

fn default_report_path() -> String {
    "comparativo_produtos.csv".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load KEY=VALUE pairs from `.env` into the process environment.
    /// Real environment variables take precedence over file entries.
    pub fn load_env_file() {
        load_env_file_at(Path::new(ENV_FILE));
    }

    pub fn portal_username() -> Result<String> {
        env_or_prompt("PORTAL_USER", "Portal username (email)")
    }

    pub fn portal_cnpj() -> Result<String> {
        env_or_prompt("PORTAL_CNPJ", "Portal CNPJ")
    }

    pub fn meli_client_id() -> Result<String> {
        env_or_prompt("MELI_CLIENT_ID", "Mercado Livre application client id")
    }

    pub fn meli_client_secret() -> Result<String> {
        env_or_prompt("MELI_CLIENT_SECRET", "Mercado Livre application client secret")
    }

    pub fn meli_access_token() -> Result<String> {
        env_or_prompt(ACCESS_TOKEN_KEY, "Mercado Livre access token")
    }

    pub fn meli_refresh_token() -> Result<String> {
        env_or_prompt(REFRESH_TOKEN_KEY, "Mercado Livre refresh token")
    }
}

pub fn load_env_file_at(path: &Path) {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return;
    };
    for line in raw.lines() {
        // Tolerate BOM and CRLF files edited on Windows.
        let line = line.trim_start_matches('\u{feff}').trim_end_matches('\r');
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || std::env::var(key).is_ok() {
            continue;
        }
        std::env::set_var(key, value.trim());
    }
}

fn env_or_prompt(key: &str, label: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(sanitize(&value)),
        _ => {
            let value = prompt(label)?;
            save_env_var(key, &value);
            Ok(value)
        }
    }
}

pub fn prompt(label: &str) -> Result<String> {
    let value = prompt_optional(label)?;
    if value.is_empty() {
        anyhow::bail!("empty value for {}", label);
    }
    Ok(value)
}

/// Like `prompt`, but a blank answer comes back as an empty string instead
/// of an error. Confirmation prompts treat it as "no".
pub fn prompt_optional(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(sanitize(&line))
}

fn sanitize(value: &str) -> String {
    value
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_string()
}

/// Append a key to `.env` so the next run does not prompt again.
fn save_env_var(key: &str, value: &str) {
    let mut contents = std::fs::read_to_string(ENV_FILE).unwrap_or_default();
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&format!("{}={}\n", key, value));
    if std::fs::write(ENV_FILE, contents).is_ok() {
        std::env::set_var(key, value);
        tracing::debug!(key, "credential saved to {}", ENV_FILE);
    }
}

/// Rewrite only the token lines of the env file, preserving every other
/// line. Keys that are not present yet are appended.
pub fn update_env_tokens_at(path: &Path, access_token: &str, refresh_token: &str) -> Result<()> {
    let original = std::fs::read_to_string(path).unwrap_or_default();
    let access_prefix = format!("{}=", ACCESS_TOKEN_KEY);
    let refresh_prefix = format!("{}=", REFRESH_TOKEN_KEY);
    let mut wrote_access = false;
    let mut wrote_refresh = false;
    let mut out = String::with_capacity(original.len() + 64);
    for line in original.lines() {
        let trimmed = line.trim_start_matches('\u{feff}').trim_end_matches('\r');
        if trimmed.trim_start().starts_with(&access_prefix) {
            out.push_str(&format!("{}{}\n", access_prefix, access_token));
            wrote_access = true;
        } else if trimmed.trim_start().starts_with(&refresh_prefix) {
            out.push_str(&format!("{}{}\n", refresh_prefix, refresh_token));
            wrote_refresh = true;
        } else {
            out.push_str(trimmed);
            out.push('\n');
        }
    }
    if !wrote_access {
        out.push_str(&format!("{}{}\n", access_prefix, access_token));
    }
    if !wrote_refresh {
        out.push_str(&format!("{}{}\n", refresh_prefix, refresh_token));
    }
    std::fs::write(path, out)
        .with_context(|| format!("failed to write env file {}", path.display()))?;
    Ok(())
}
