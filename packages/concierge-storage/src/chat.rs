use sqlx::PgExecutor;

use crate::{Result, models::ChatMessage};

pub async fn insert_chat_message<'e, E>(executor: E, message: &ChatMessage) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO chat_messages (message_id, user_id, chat_id, role, content, created_at)
VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (message_id) DO NOTHING",
	)
	.bind(message.message_id)
	.bind(message.user_id.as_str())
	.bind(message.chat_id.as_str())
	.bind(message.role.as_str())
	.bind(message.content.as_str())
	.bind(message.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Most recent messages of one chat, oldest first.
pub async fn recent_chat_messages<'e, E>(
	executor: E,
	user_id: &str,
	chat_id: &str,
	limit: i64,
) -> Result<Vec<ChatMessage>>
where
	E: PgExecutor<'e>,
{
	let mut rows = sqlx::query_as::<_, ChatMessage>(
		"\
SELECT message_id, user_id, chat_id, role, content, created_at
FROM chat_messages
WHERE user_id = $1 AND chat_id = $2
ORDER BY created_at DESC, message_id DESC
LIMIT $3",
	)
	.bind(user_id)
	.bind(chat_id)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	rows.reverse();

	Ok(rows)
}
