//! Best-effort audit recording.

use tracing::warn;

use osign_contracts::audit::AuditEntry;

use crate::traits::AuditSink;

/// Append `entry`, logging instead of failing when the sink is unavailable.
///
/// Returns `false` when the write failed so callers can add a warning.
pub(crate) async fn append_audit(sink: &dyn AuditSink, entry: AuditEntry) -> bool {
    match sink.append(&entry).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                os_id = %entry.os_id,
                event_type = %entry.event_type,
                error = %e,
                "audit event not recorded"
            );
            false
        }
    }
}
