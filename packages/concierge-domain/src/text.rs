use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use unicode_segmentation::UnicodeSegmentation;

/// Lower-cases and strips diacritics so "Promoción" and "promocion" compare equal.
pub fn fold(input: &str) -> String {
	input.nfd().filter(|ch| !is_combining_mark(*ch)).flat_map(char::to_lowercase).collect()
}

pub fn folded_words(input: &str) -> Vec<String> {
	fold(input).unicode_words().map(str::to_string).collect()
}

pub fn word_count(input: &str) -> usize {
	input.unicode_words().count()
}

/// True when any word starts with one of the keywords, or when a multi-word keyword appears in
/// the folded word sequence.
pub fn mentions_any(input: &str, keywords: &[&str]) -> bool {
	let words = folded_words(input);
	let joined = words.join(" ");

	keywords.iter().any(|keyword| {
		if keyword.contains(' ') {
			joined.contains(keyword)
		} else {
			words.iter().any(|word| word.starts_with(keyword))
		}
	})
}
