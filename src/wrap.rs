//! Word-boundary segmentation and line wrapping.

use icu_segmenter::WordSegmenter;

use crate::{error::Error, options::FilterOptions};

/// Column budget shared by every wrapping codec.
pub const MAX_COLUMNS: usize = 80;

/// Languages written without spaces between words that need the LSTM model.
const LSTM_LANGUAGES: [&str; 4] = ["th", "lo", "km", "my"];

/// Splits text at word boundaries for the content locale.
pub struct WordBreaker {
    segmenter: WordSegmenter,
}

impl WordBreaker {
    /// Creates a breaker for the options' content locale.
    pub fn new(options: Option<&FilterOptions>) -> Result<Self, Error> {
        let language = options
            .map(FilterOptions::language_identifier)
            .transpose()?
            .flatten();
        let use_lstm = language
            .as_ref()
            .is_some_and(|langid| LSTM_LANGUAGES.contains(&langid.language.as_str()));
        let segmenter = if use_lstm {
            WordSegmenter::new_lstm()
        } else {
            WordSegmenter::new_dictionary()
        };
        Ok(Self { segmenter })
    }

    /// Returns the segments between consecutive word boundaries.
    ///
    /// Joining the segments yields the input again.
    pub fn segments<'s>(&self, text: &'s str) -> Vec<&'s str> {
        let breaks: Vec<usize> = self.segmenter.segment_str(text).collect();
        breaks
            .windows(2)
            .map(|w| &text[w[0]..w[1]])
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// Greedily fills lines of at most `width` columns, breaking only at word
    /// boundaries. A single word wider than `width` gets a line of its own.
    ///
    /// Joining the returned lines yields the input again; whitespace stays at the
    /// end of the line it follows.
    pub fn fill(&self, text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut columns = 0;
        for segment in self.segments(text) {
            let seg_columns = segment.chars().count();
            let is_space = segment.chars().all(char::is_whitespace);
            if columns > 0 && !is_space && columns + seg_columns > width {
                lines.push(std::mem::take(&mut current));
                columns = 0;
            }
            current.push_str(segment);
            columns += seg_columns;
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Number of display columns a string occupies, counting tabs as `tab_width`.
pub fn columns(s: &str, tab_width: usize) -> usize {
    s.chars().map(|c| if c == '\t' { tab_width } else { 1 }).sum()
}
