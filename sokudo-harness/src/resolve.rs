//! Engine resolution with precision fallback
//!
//! A requested variant names a preferred precision tier; if that tier's
//! artifact is unavailable the other tier is tried once. Loaders are
//! nullable (an absent loader simply cannot supply an engine) and may
//! perform I/O; a failed loader is not retried within one resolution, and
//! failures are not cached across resolutions.

use crate::engine::Tiered;
use crate::variant::Precision;
use tracing::{debug, warn};

/// Resolve an engine for the requested precision, falling back to the
/// other tier. Returns `None` when neither loader produced an engine —
/// callers treat that as "capability unavailable", not a crash.
pub fn resolve_engine<F, H, LF, LH>(
    requested: Precision,
    load_fp32: Option<LF>,
    load_fp16: Option<LH>,
) -> Option<Tiered<F, H>>
where
    LF: FnOnce() -> Option<F>,
    LH: FnOnce() -> Option<H>,
{
    match requested {
        Precision::Fp32 => {
            let attempted = load_fp32.is_some();
            if let Some(engine) = load_fp32.and_then(|load| load()) {
                return Some(Tiered::Fp32(engine));
            }
            let load = load_fp16?;
            // Silent when the preferred tier was never configured.
            if attempted {
                warn!("fp32 engine unavailable, falling back to fp16");
            }
            load().map(Tiered::Fp16)
        }
        Precision::Fp16 => {
            let attempted = load_fp16.is_some();
            if let Some(engine) = load_fp16.and_then(|load| load()) {
                return Some(Tiered::Fp16(engine));
            }
            let load = load_fp32?;
            if attempted {
                warn!("fp16 engine unavailable, falling back to fp32");
            }
            load().map(Tiered::Fp32)
        }
    }
}

/// Async twin of [`resolve_engine`] with identical branching semantics,
/// for loaders that await artifact I/O.
pub async fn resolve_engine_async<F, H, LF, LH>(
    requested: Precision,
    load_fp32: Option<LF>,
    load_fp16: Option<LH>,
) -> Option<Tiered<F, H>>
where
    LF: AsyncFnOnce() -> Option<F>,
    LH: AsyncFnOnce() -> Option<H>,
{
    match requested {
        Precision::Fp32 => {
            let attempted = load_fp32.is_some();
            if let Some(load) = load_fp32
                && let Some(engine) = load().await
            {
                return Some(Tiered::Fp32(engine));
            }
            let load = load_fp16?;
            if attempted {
                warn!("fp32 engine unavailable, falling back to fp16");
            }
            let engine = load().await?;
            debug!("resolved fp16 engine via fallback");
            Some(Tiered::Fp16(engine))
        }
        Precision::Fp16 => {
            let attempted = load_fp16.is_some();
            if let Some(load) = load_fp16
                && let Some(engine) = load().await
            {
                return Some(Tiered::Fp16(engine));
            }
            let load = load_fp32?;
            if attempted {
                warn!("fp16 engine unavailable, falling back to fp32");
            }
            let engine = load().await?;
            debug!("resolved fp32 engine via fallback");
            Some(Tiered::Fp32(engine))
        }
    }
}
