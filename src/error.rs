use thiserror::Error;

/// Failures surfaced by scene construction and synchronization.
///
/// The `OutOfSync` variants indicate that a graph event referenced a key the
/// scene has no visual for. Since visuals are created and dropped in lockstep
/// with topology events, hitting one of these means events were skipped or
/// replayed out of order.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("canvas size {width}x{height} is not positive")]
    InvalidCanvasSize { width: f32, height: f32 },

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("resolved {kind} style has the wrong shape: {source}")]
    StyleShape {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("node {0:?} is missing a numeric {1:?} attribute")]
    MissingCoordinate(String, &'static str),

    #[error("unknown graph node {0:?}")]
    UnknownNode(String),

    #[error("unknown graph edge {0:?}")]
    UnknownEdge(String),

    #[error("scene out of sync: no visual for node {0:?}")]
    NodeOutOfSync(String),

    #[error("scene out of sync: no visual for edge {0:?}")]
    EdgeOutOfSync(String),
}
