use crate::error::{NotifyError, Result};
use crate::NotificationChannel;
use serde_json::Value;
use std::collections::HashMap;

/// Factory for [`NotificationChannel`] instances built from JSON settings.
pub trait ChannelPlugin: Send + Sync {
    /// Returns the plugin type name (e.g., `"email"`, `"webhook"`).
    fn name(&self) -> &str;

    /// Validates a JSON config blob against this plugin's expected schema.
    fn validate_config(&self, config: &Value) -> Result<()>;

    /// Creates a configured channel from a validated JSON config.
    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>>;
}

/// Parse a plugin's settings, mapping failures to `InvalidConfig`.
pub(crate) fn parse_config<T: serde::de::DeserializeOwned>(
    plugin: &str,
    config: &Value,
) -> Result<T> {
    // Missing settings table means "all defaults".
    let config = if config.is_null() {
        Value::Object(Default::default())
    } else {
        config.clone()
    };
    serde_json::from_value(config)
        .map_err(|e| NotifyError::InvalidConfig(format!("{plugin}: {e}")))
}

/// Registry of available [`ChannelPlugin`]s.
///
/// # Examples
///
/// ```
/// use claimmon_notify::plugin::ChannelRegistry;
///
/// let registry = ChannelRegistry::default();
/// assert!(registry.has_plugin("console"));
/// assert!(registry.has_plugin("webhook"));
/// assert!(registry.has_plugin("email"));
/// assert!(registry.has_plugin("sms"));
/// assert!(!registry.has_plugin("pager"));
/// ```
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        let name = plugin.name().to_string();
        self.plugins.insert(name, plugin);
    }

    pub fn create_channel(
        &self,
        type_name: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        let plugin = self
            .plugins
            .get(type_name)
            .ok_or_else(|| NotifyError::UnknownChannelType(type_name.to_string()))?;
        plugin.validate_config(config)?;
        plugin.create_channel(config)
    }

    pub fn has_plugin(&self, type_name: &str) -> bool {
        self.plugins.contains_key(type_name)
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::channels::console::ConsolePlugin));
        registry.register(Box::new(crate::channels::webhook::WebhookPlugin));
        registry.register(Box::new(crate::channels::email::EmailPlugin));
        registry.register(Box::new(crate::channels::sms::SmsPlugin));
        registry
    }
}
