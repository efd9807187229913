//! Fragment selection and placeholder binding.
//!
//! Templates use named placeholders (`{weekday}`, `{speaker}`, ...). Each
//! template category accepts a fixed set of names; anything else is rejected
//! instead of being bound to the wrong value.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::config::Language;
use crate::error::PodcastError;
use crate::section::{Section, Voice};
use crate::templates::{TemplateRecord, TemplateStore};
use crate::weather::{Forecast, WeatherCategory};

/// Template categories and the placeholders each one may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateCategory {
    WeatherIntro,
    PlainIntro,
    Outro,
    Gimmick,
    Transition,
}

impl TemplateCategory {
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            TemplateCategory::WeatherIntro => &[
                "weekday", "monthday", "month", "location", "min_temp", "max_temp", "weather",
                "org", "podcast",
            ],
            TemplateCategory::PlainIntro => &["weekday", "monthday", "month", "org", "podcast"],
            TemplateCategory::Outro => &["org", "podcast"],
            TemplateCategory::Gimmick => &[],
            TemplateCategory::Transition => &["speaker"],
        }
    }
}

static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}"));

/// Replace named placeholders in `template`.
///
/// Fails if the template uses a name outside the category's schema, or a
/// schema name for which no value was supplied.
pub fn bind(
    category: TemplateCategory,
    template: &str,
    values: &[(&str, &str)],
) -> Result<String, PodcastError> {
    let re = PLACEHOLDER
        .as_ref()
        .map_err(|e| PodcastError::Template(format!("Invalid placeholder pattern: {}", e)))?;
    let schema = category.placeholders();

    for caps in re.captures_iter(template) {
        let name = &caps[1];
        if !schema.contains(&name) {
            return Err(PodcastError::Template(format!(
                "Placeholder '{{{}}}' is not allowed in {:?} templates: '{}'",
                name, category, template
            )));
        }
        if !values.iter().any(|(key, _)| *key == name) {
            return Err(PodcastError::Template(format!(
                "No value supplied for placeholder '{{{}}}' in '{}'",
                name, template
            )));
        }
    }

    let bound = re.replace_all(template, |caps: &regex::Captures| {
        values
            .iter()
            .find(|(key, _)| *key == &caps[1])
            .map(|(_, value)| value.to_string())
            .unwrap_or_default()
    });
    Ok(bound.into_owned())
}

/// Calendar and naming context for intros and outros.
#[derive(Debug, Clone)]
pub struct IntroContext {
    pub date: NaiveDate,
    pub language: Language,
    pub org: String,
    pub podcast: String,
}

impl IntroContext {
    fn calendar(&self) -> (String, String, String) {
        (
            self.language.weekday_name(self.date.weekday()).to_string(),
            self.date.day().to_string(),
            self.language.month_name(self.date.month()).to_string(),
        )
    }
}

/// The four transitions of one episode, before voices and speakers are bound.
#[derive(Debug, Clone)]
pub struct TransitionSet {
    pub intro_to_content: Section,
    pub content_intro_to_content_info: Section,
    pub to_last_content: Section,
    pub to_outro: Section,
}

/// Picks templates uniformly at random from an injected source.
pub struct FragmentSelector {
    rng: fastrand::Rng,
}

impl Default for FragmentSelector {
    fn default() -> Self {
        Self::new(fastrand::Rng::new())
    }
}

impl FragmentSelector {
    pub fn new(rng: fastrand::Rng) -> Self {
        Self { rng }
    }

    /// Deterministic selector for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(fastrand::Rng::with_seed(seed))
    }

    /// Pick one record from a pool.
    pub fn pick<'a>(
        &mut self,
        pool: &'a [TemplateRecord],
        pool_name: &str,
    ) -> Result<&'a TemplateRecord, PodcastError> {
        if pool.is_empty() {
            return Err(PodcastError::Template(format!(
                "Template pool '{}' is empty",
                pool_name
            )));
        }
        Ok(&pool[self.rng.usize(..pool.len())])
    }

    /// Intro mentioning the weather forecast for `location`.
    pub fn weather_intro(
        &mut self,
        store: &TemplateStore,
        ctx: &IntroContext,
        location: &str,
        forecast: &Forecast,
    ) -> Result<Section, PodcastError> {
        let category = WeatherCategory::from_code(forecast.code);
        let pool = store.weather_intros(category.as_str()).ok_or_else(|| {
            PodcastError::Template(format!(
                "No weather intros for '{}' and no default pool",
                category.as_str()
            ))
        })?;
        let record = self.pick(pool, "weather_intros")?;

        let (weekday, monthday, month) = ctx.calendar();
        let min_temp = format!("{:.0}", forecast.min_temp);
        let max_temp = format!("{:.0}", forecast.max_temp);
        let text = bind(
            TemplateCategory::WeatherIntro,
            &record.text,
            &[
                ("weekday", &weekday),
                ("monthday", &monthday),
                ("month", &month),
                ("location", location),
                ("min_temp", &min_temp),
                ("max_temp", &max_temp),
                ("weather", &forecast.description),
                ("org", &ctx.org),
                ("podcast", &ctx.podcast),
            ],
        )?;
        Ok(Section::intro(text, record.voice.unwrap_or(Voice::Male)))
    }

    /// Intro without weather information.
    pub fn plain_intro(
        &mut self,
        store: &TemplateStore,
        ctx: &IntroContext,
    ) -> Result<Section, PodcastError> {
        let record = self.pick(&store.intros.no_weather_intros, "no_weather_intros")?;
        let (weekday, monthday, month) = ctx.calendar();
        let text = bind(
            TemplateCategory::PlainIntro,
            &record.text,
            &[
                ("weekday", &weekday),
                ("monthday", &monthday),
                ("month", &month),
                ("org", &ctx.org),
                ("podcast", &ctx.podcast),
            ],
        )?;
        Ok(Section::intro(text, record.voice.unwrap_or(Voice::Male)))
    }

    pub fn outro(
        &mut self,
        store: &TemplateStore,
        ctx: &IntroContext,
    ) -> Result<Section, PodcastError> {
        let record = self.pick(&store.outros, "outros")?;
        let text = bind(
            TemplateCategory::Outro,
            &record.text,
            &[("org", &ctx.org), ("podcast", &ctx.podcast)],
        )?;
        Ok(Section::outro(text, record.voice.unwrap_or(Voice::Female)))
    }

    pub fn gimmick(&mut self, store: &TemplateStore) -> Result<Section, PodcastError> {
        let record = self.pick(&store.gimmicks, "gimmicks")?;
        let text = bind(TemplateCategory::Gimmick, &record.text, &[])?;
        Ok(Section::gimmick(text, record.voice.unwrap_or(Voice::Male)))
    }

    /// One template from each transition pool. `{speaker}` stays unbound;
    /// the sequencer binds it once voices are known.
    pub fn transitions(&mut self, store: &TemplateStore) -> Result<TransitionSet, PodcastError> {
        let pools = &store.transitions;
        let mut take = |pool: &[TemplateRecord], name: &str| -> Result<Section, PodcastError> {
            let record = self.pick(pool, name)?;
            Ok(Section::transition(
                record.text.clone(),
                record.voice.unwrap_or(Voice::Male),
            ))
        };

        Ok(TransitionSet {
            intro_to_content: take(&pools.intro_to_content, "intro_to_content")?,
            content_intro_to_content_info: take(
                &pools.content_intro_to_content_info,
                "content_intro_to_content_info",
            )?,
            to_last_content: take(&pools.to_last_content, "to_last_content")?,
            to_outro: take(&pools.to_outro, "to_outro")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::tests::store;

    fn ctx() -> IntroContext {
        IntroContext {
            date: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
            language: Language::En,
            org: "Acme".to_string(),
            podcast: "Morning Brief".to_string(),
        }
    }

    fn records(n: usize) -> Vec<TemplateRecord> {
        (0..n)
            .map(|i| TemplateRecord {
                text: format!("template {}", i),
                voice: None,
            })
            .collect()
    }

    #[test]
    fn test_bind_named_placeholders() {
        let text = bind(
            TemplateCategory::Transition,
            "Thanks {speaker}, over to you {speaker}.",
            &[("speaker", "Ana")],
        )
        .unwrap();
        assert_eq!(text, "Thanks Ana, over to you Ana.");
    }

    #[test]
    fn test_bind_rejects_unknown_placeholder() {
        let err = bind(TemplateCategory::Outro, "Bye from {location}", &[]).unwrap_err();
        assert!(matches!(err, PodcastError::Template(_)));
    }

    #[test]
    fn test_bind_rejects_missing_value() {
        let err = bind(TemplateCategory::Transition, "Hi {speaker}", &[]).unwrap_err();
        assert!(matches!(err, PodcastError::Template(_)));
    }

    #[test]
    fn test_placeholder_pattern_is_shared_across_calls() {
        assert!(PLACEHOLDER.is_ok());
        for speaker in ["Alberto", "Mónica"] {
            let text = bind(TemplateCategory::Transition, "Thanks {speaker}.", &[("speaker", speaker)])
                .unwrap();
            assert_eq!(text, format!("Thanks {}.", speaker));
        }
    }

    #[test]
    fn test_bind_without_placeholders() {
        let text = bind(TemplateCategory::Transition, "And finally.", &[]).unwrap();
        assert_eq!(text, "And finally.");
    }

    #[test]
    fn test_pick_is_deterministic_for_seed() {
        let pool = records(20);
        let picks = |seed| {
            let mut selector = FragmentSelector::with_seed(seed);
            (0..10)
                .map(|_| selector.pick(&pool, "pool").unwrap().text.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    #[test]
    fn test_pick_empty_pool() {
        let mut selector = FragmentSelector::with_seed(1);
        assert!(selector.pick(&[], "outros").is_err());
    }

    #[test]
    fn test_plain_intro_binds_calendar() {
        let mut selector = FragmentSelector::with_seed(7);
        let intro = selector.plain_intro(&store(), &ctx()).unwrap();
        assert_eq!(intro.text, "Good morning, it is Wednesday, March 6.");
        assert_eq!(intro.voice, Voice::Male);
    }

    #[test]
    fn test_weather_intro_uses_category_pool() {
        let mut selector = FragmentSelector::with_seed(7);
        let forecast = Forecast {
            min_temp: 8.4,
            max_temp: 14.6,
            description: "light rain".to_string(),
            code: 500,
        };
        let intro = selector
            .weather_intro(&store(), &ctx(), "Barcelona", &forecast)
            .unwrap();
        assert_eq!(intro.text, "Rainy Wednesday in Barcelona.");
        assert_eq!(intro.voice, Voice::Female);
    }

    #[test]
    fn test_weather_intro_default_pool() {
        let mut selector = FragmentSelector::with_seed(7);
        let forecast = Forecast {
            min_temp: 8.4,
            max_temp: 14.6,
            description: "clear sky".to_string(),
            code: 800,
        };
        let intro = selector
            .weather_intro(&store(), &ctx(), "Barcelona", &forecast)
            .unwrap();
        assert_eq!(
            intro.text,
            "Happy Wednesday 6 March from Barcelona, 8 to 15, clear sky. This is Morning Brief by Acme."
        );
    }

    #[test]
    fn test_transitions_keep_speaker_unbound() {
        let mut selector = FragmentSelector::with_seed(3);
        let set = selector.transitions(&store()).unwrap();
        assert_eq!(set.intro_to_content.text, "Over to you, {speaker}.");
        assert_eq!(set.to_last_content.text, "And finally.");
    }

    #[test]
    fn test_outro_binds_names() {
        let mut selector = FragmentSelector::with_seed(3);
        let outro = selector.outro(&store(), &ctx()).unwrap();
        assert_eq!(outro.text, "That was Morning Brief. See you tomorrow.");
    }

    #[test]
    fn test_shipped_templates_bind_in_every_language() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates");
        let values = [
            ("weekday", "Monday"),
            ("monthday", "1"),
            ("month", "May"),
            ("location", "Girona"),
            ("min_temp", "9"),
            ("max_temp", "21"),
            ("weather", "clear sky"),
            ("org", "Acme"),
            ("podcast", "Morning Brief"),
            ("speaker", "Alberto"),
        ];
        for language in [Language::Es, Language::Ca, Language::En] {
            let store = TemplateStore::load(&dir, language).unwrap();
            let checks = store
                .intros
                .weather_intros
                .values()
                .flatten()
                .map(|r| (TemplateCategory::WeatherIntro, r))
                .chain(store.intros.no_weather_intros.iter().map(|r| (TemplateCategory::PlainIntro, r)))
                .chain(store.outros.iter().map(|r| (TemplateCategory::Outro, r)))
                .chain(store.gimmicks.iter().map(|r| (TemplateCategory::Gimmick, r)))
                .chain(
                    [
                        &store.transitions.intro_to_content,
                        &store.transitions.content_intro_to_content_info,
                        &store.transitions.to_last_content,
                        &store.transitions.to_outro,
                    ]
                    .into_iter()
                    .flatten()
                    .map(|r| (TemplateCategory::Transition, r)),
                );
            for (category, record) in checks {
                let text = bind(category, &record.text, &values)
                    .unwrap_or_else(|e| panic!("{:?} '{}': {}", language, record.text, e));
                assert!(!text.contains('{'));
            }
            assert!(store.weather_intros("default").is_some());
        }
    }
}
