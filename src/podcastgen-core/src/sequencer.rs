//! Section sequencing.
//!
//! Orders intro, transitions, ingested content, gimmick and outro into the
//! final script. The speaker handoffs decide between a spoken transition and
//! a silent one:
//!
//! ```text
//! introduction + first half + [to_last_content] + second half + outroduction
//! ```
//!
//! The second half is the closing news item (title and body, plus the
//! transition in front of it when the content already has one).

use crate::config::SpeakerNames;
use crate::error::PodcastError;
use crate::section::Section;
use crate::selector::{TemplateCategory, TransitionSet, bind};

/// Template-derived sections framing the content.
#[derive(Debug, Clone)]
pub struct Bookends {
    pub intro: Section,
    pub outro: Section,
    /// Present when the configuration declared a gimmick slot.
    pub gimmick: Option<Section>,
}

/// Content split around the `to_last_content` transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSplit {
    pub first_half: Vec<Section>,
    pub second_half: Vec<Section>,
}

/// Split content into the regular items and the closing item.
///
/// The second half is the last 2 entries, or the last 3 when the
/// third-from-last entry is a transition so it stays with its title/body.
/// Fails when fewer than two content sections exist or nothing is left for
/// the first half.
pub fn split_content(mut content: Vec<Section>) -> Result<ContentSplit, PodcastError> {
    let items = content.iter().filter(|s| !s.is_transition()).count();
    if items < 2 {
        return Err(PodcastError::Structure(format!(
            "Podcast must have at least one full news item, got {} content sections",
            items
        )));
    }

    let len = content.len();
    let tail = match len.checked_sub(3).map(|i| content[i].is_transition()) {
        Some(true) => 3,
        _ => 2,
    };
    let second_half = content.split_off(len - tail);
    if content.is_empty() {
        return Err(PodcastError::Structure(
            "Podcast must have more than 1 content: nothing precedes the closing item".to_string(),
        ));
    }

    Ok(ContentSplit {
        first_half: content,
        second_half,
    })
}

/// Produce the complete, voice-consistent script.
pub fn sequence(
    content: Vec<Section>,
    bookends: Bookends,
    transitions: TransitionSet,
    speakers: &SpeakerNames,
) -> Result<Vec<Section>, PodcastError> {
    let ContentSplit {
        mut first_half,
        mut second_half,
    } = split_content(content)?;

    if let Some(last) = first_half.last_mut() {
        last.has_transition = false;
    }
    for section in &mut second_half {
        section.is_news = false;
    }

    let TransitionSet {
        mut intro_to_content,
        mut content_intro_to_content_info,
        mut to_last_content,
        mut to_outro,
    } = transitions;
    let Bookends {
        mut intro,
        outro,
        gimmick,
    } = bookends;

    let lead_voice = first_half[0].voice;
    let closing_first_voice = second_half[0].voice;
    let closing_last_voice = second_half[second_half.len() - 1].voice;

    intro_to_content.voice = lead_voice.opposite();
    content_intro_to_content_info.voice = lead_voice;
    to_last_content.voice = closing_first_voice.opposite();
    to_outro.voice = to_last_content.voice;

    to_last_content.text = bind(TemplateCategory::Transition, &to_last_content.text, &[])?;

    let introduction = if lead_voice == intro.voice {
        intro.has_transition = true;
        vec![intro]
    } else {
        intro_to_content.text = bind(
            TemplateCategory::Transition,
            &intro_to_content.text,
            &[("speaker", speakers.name(lead_voice))],
        )?;
        content_intro_to_content_info.text = bind(
            TemplateCategory::Transition,
            &content_intro_to_content_info.text,
            &[("speaker", speakers.name(intro.voice))],
        )?;
        vec![intro, intro_to_content, content_intro_to_content_info]
    };

    let mut outroduction = Vec::with_capacity(3);
    if closing_last_voice != outro.voice {
        to_outro.text = bind(
            TemplateCategory::Transition,
            &to_outro.text,
            &[("speaker", speakers.name(closing_last_voice))],
        )?;
        outroduction.push(to_outro);
    }
    outroduction.extend(gimmick);
    outroduction.push(outro);

    let mut script = Vec::with_capacity(
        introduction.len() + first_half.len() + 1 + second_half.len() + outroduction.len(),
    );
    script.extend(introduction);
    script.extend(first_half);
    script.push(to_last_content);
    script.extend(second_half);
    script.extend(outroduction);
    Ok(script)
}
