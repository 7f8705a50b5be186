//! User-facing message catalogue backed by Fluent.
//!
//! Russian is the default locale; English is used when Telegram reports an
//! `en*` language code. Resources are compiled into the binary.

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::warn;
use unic_langid::LanguageIdentifier;

pub const DEFAULT_LANGUAGE: &str = "ru";
pub const SUPPORTED_LANGUAGES: &[&str] = &["ru", "en"];

const RU_RESOURCE: &str = include_str!("../locales/ru/main.ftl");
const EN_RESOURCE: &str = include_str!("../locales/en/main.ftl");

/// Localization manager holding one bundle per supported language
pub struct LocalizationManager {
    bundles: HashMap<&'static str, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Build bundles for every supported language
    pub fn new() -> anyhow::Result<Self> {
        let mut bundles = HashMap::new();
        for (language, source) in [("ru", RU_RESOURCE), ("en", EN_RESOURCE)] {
            bundles.insert(language, Self::create_bundle(language, source)?);
        }
        Ok(Self { bundles })
    }

    fn create_bundle(language: &str, source: &str) -> anyhow::Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = language.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Telegram renders the isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("Invalid {language} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("Duplicate {language} messages: {errors:?}"))?;
        Ok(bundle)
    }

    /// Map a Telegram language code to a supported language
    pub fn resolve_language(language_code: Option<&str>) -> &'static str {
        let code = language_code.unwrap_or(DEFAULT_LANGUAGE).to_lowercase();
        SUPPORTED_LANGUAGES
            .iter()
            .copied()
            .find(|lang| code == *lang || code.starts_with(&format!("{lang}-")))
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Get a message in the given language, falling back to the default language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language_code: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let language = Self::resolve_language(Some(language_code));
        let bundle = match self.bundles.get(language).or_else(|| self.bundles.get(DEFAULT_LANGUAGE)) {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match bundle.get_message(key).and_then(|msg| msg.value()) {
            Some(pattern) => pattern,
            None => return format!("Missing translation: {key}"),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, ?errors, "Fluent formatting errors");
        }
        value.into_owned()
    }

    /// Whether `text` equals the message `key` in any supported language
    pub fn matches_any_language(&self, key: &str, text: &str) -> bool {
        SUPPORTED_LANGUAGES
            .iter()
            .any(|language| self.get_message_in_language(key, language, None) == text)
    }
}

lazy_static! {
    static ref LOCALIZATION_MANAGER: Option<LocalizationManager> = match LocalizationManager::new() {
        Ok(manager) => Some(manager),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load localization resources");
            None
        }
    };
}

/// Force resource loading at start-up so broken resources fail loudly
pub fn init_localization() -> anyhow::Result<()> {
    match LOCALIZATION_MANAGER.as_ref() {
        Some(_) => Ok(()),
        None => Err(anyhow::anyhow!("Localization resources failed to load")),
    }
}

/// Localized message for the user's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    t_args_lang(key, &[], language_code)
}

/// Localized message with arguments for the user's language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    match LOCALIZATION_MANAGER.as_ref() {
        Some(manager) => {
            let language = LocalizationManager::resolve_language(language_code);
            let map: HashMap<&str, &str> = args.iter().copied().collect();
            let args = if map.is_empty() { None } else { Some(&map) };
            manager.get_message_in_language(key, language, args)
        }
        None => key.to_string(),
    }
}

/// Whether `text` is the label of the menu button `key` in any language
pub fn is_label(key: &str, text: &str) -> bool {
    LOCALIZATION_MANAGER
        .as_ref()
        .is_some_and(|manager| manager.matches_any_language(key, text))
}
