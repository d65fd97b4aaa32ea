pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Record id {record_id} for kind {kind} is outside the indexable id range.")]
	IdOutOfRange { kind: &'static str, record_id: i64 },
	#[error("Record {record_id} of kind {kind} has no searchable text.")]
	EmptySearchableText { kind: &'static str, record_id: i64 },
}
