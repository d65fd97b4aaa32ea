use concierge_domain::intent::DetailField;

/// Stands in for the catalog context when retrieval failed.
pub const UNAVAILABLE_CONTEXT: &str = "Catalog lookup is temporarily unavailable.";

pub fn system_instructions(assistant_name: &str) -> String {
	format!(
		"\
You are {assistant_name}, the customer support assistant of an online course catalog.
Answer in the customer's language with a warm, concise tone.
Only discuss the catalog, its categories, promotions, enrollment, and pricing. Politely decline \
anything else and steer back to the catalog.
Use only the catalog context provided. Never invent courses, prices, dates, or discounts.
When an item is not available, say so plainly and offer similar available items from the context.
Quote prices exactly as given and mention an active promotion whenever one applies.
If the context says nothing matched or lookup is unavailable, say you could not find it and ask a \
clarifying question."
	)
}

pub struct PromptParts<'a> {
	pub context: &'a str,
	pub conversation: Option<&'a str>,
	pub sales: Option<&'a str>,
	pub focus: Option<DetailField>,
	pub message: &'a str,
}

pub fn build_prompt(parts: &PromptParts<'_>) -> String {
	let mut sections = vec![format!("## Catalog context\n{}", parts.context.trim())];

	if let Some(conversation) = parts.conversation {
		sections.push(format!("## Conversation so far\n{conversation}"));
	}
	if let Some(field) = parts.focus {
		sections.push(format!(
			"## Follow-up\nThe customer is asking about the {} of the item in the catalog context.",
			field.as_str()
		));
	}
	if let Some(sales) = parts.sales {
		sections.push(format!("## Sales guidance\n{sales}"));
	}

	sections.push(format!("## Customer message\n{}", parts.message.trim()));

	sections.join("\n\n")
}
