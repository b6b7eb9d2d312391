/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Archiving and listing of finalized matches.
pub mod history_service;
/// Mutations of the active match.
pub mod match_service;
/// Series progress aggregation.
pub mod series_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
/// Remote mirror writes and subscription to remote matches.
pub mod sync_reconciler;
