use crate::text;

const RULES: &[(&[&str], &str)] = &[
	(
		&["principiante", "basico", "beginner", "basic", "introduc"],
		"Beginner interest: mention intermediate courses as the natural next step.",
	),
	(
		&["intermedio", "avanzado", "intermediate", "advanced"],
		"Experienced learner: suggest hands-on project courses to apply the skills.",
	),
	(
		&["deep learning"],
		"Deep learning interest: recommend machine learning fundamentals as a complement.",
	),
	(
		&["machine learning", "aprendizaje automatico"],
		"Machine learning interest: mention deep learning courses as a follow-up.",
	),
	(&["python"], "Python interest: suggest courses on popular Python frameworks."),
];

/// The cross-sell hint of the first matching rule. Rules are ordered from most to least specific.
pub fn suggestions(message: &str) -> Option<String> {
	RULES
		.iter()
		.find(|(keywords, _)| text::mentions_any(message, keywords))
		.map(|(_, line)| (*line).to_string())
}
