//! Host events forwarded from the UI thread to the engine.
//!
//! These are delivered on the render thread, once per tick, after the frame
//! hand-off and before `update`.

/// Pointer button identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Primary (left) button or single touch.
    Left,
    /// Secondary (right) button or long press.
    Right,
    /// Middle button.
    Middle,
}

/// UI-originated input or report for the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// A pointer button went down.
    PointerDown {
        /// Button.
        button: PointerButton,
        /// X in surface pixels.
        x: i32,
        /// Y in surface pixels.
        y: i32,
    },
    /// A pointer button went up.
    PointerUp {
        /// Button.
        button: PointerButton,
        /// X in surface pixels.
        x: i32,
        /// Y in surface pixels.
        y: i32,
    },
    /// The pointer moved.
    PointerMove {
        /// X in surface pixels.
        x: i32,
        /// Y in surface pixels.
        y: i32,
    },
    /// A double click or double tap.
    DoubleClick {
        /// Button.
        button: PointerButton,
        /// X in surface pixels.
        x: i32,
        /// Y in surface pixels.
        y: i32,
    },
    /// Two fingers touched down.
    Touch2Down {
        /// First finger X.
        x1: i32,
        /// First finger Y.
        y1: i32,
        /// Second finger X.
        x2: i32,
        /// Second finger Y.
        y2: i32,
    },
    /// Two fingers moved.
    Touch2Move {
        /// First finger X.
        x1: i32,
        /// First finger Y.
        y1: i32,
        /// Second finger X.
        x2: i32,
        /// Second finger Y.
        y2: i32,
    },
    /// Two fingers lifted.
    Touch2Up {
        /// First finger X.
        x1: i32,
        /// First finger Y.
        y1: i32,
        /// Second finger X.
        x2: i32,
        /// Second finger Y.
        y2: i32,
    },
    /// The platform picked a capture size for the running camera.
    CameraSize {
        /// Chosen size index.
        size_index: i32,
        /// Largest valid size index.
        size_index_max: i32,
        /// Capture width in pixels.
        width: u32,
        /// Capture height in pixels.
        height: u32,
    },
    /// A named device parameter (model, OS version, ...).
    DeviceParameter {
        /// Parameter name.
        key: String,
        /// Parameter value.
        value: String,
    },
}
