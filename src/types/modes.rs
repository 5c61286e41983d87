//! One-byte enumerations embedded in payloads.

wire_enum! {
    pub enum ModeSystem {
        None = 0x00,
        Boot = 0x10,
        Start = 0x11,
        Running = 0x12,
        ReadyToReset = 0x13,
        Error = 0xA0,
    }
}

wire_enum! {
    /// Flight state machine position reported in `State` frames.
    pub enum ModeFlight {
        None = 0x00,
        Ready = 0x10,
        Start = 0x11,
        TakeOff = 0x12,
        Flight = 0x13,
        Landing = 0x14,
        Flip = 0x15,
        Reverse = 0x16,
        Stop = 0x20,
        Accident = 0x30,
        Error = 0x31,
        Test = 0x40,
    }
}

impl ModeFlight {
    /// Whether the propellers are spinning under flight control.
    pub fn is_airborne(self) -> bool {
        matches!(
            self,
            ModeFlight::Start
                | ModeFlight::TakeOff
                | ModeFlight::Flight
                | ModeFlight::Landing
                | ModeFlight::Flip
                | ModeFlight::Reverse
        )
    }
}

wire_enum! {
    pub enum ModeControlFlight {
        None = 0x00,
        Attitude = 0x10,
        Position = 0x11,
        Manual = 0x12,
        Rate = 0x13,
        Function = 0x14,
    }
}

wire_enum! {
    pub enum ModeMovement {
        None = 0x00,
        Ready = 0x01,
        Hovering = 0x02,
        Moving = 0x03,
        ReturnHome = 0x04,
    }
}

wire_enum! {
    pub enum Headless {
        None = 0x00,
        Headless = 0x01,
        Normal = 0x02,
    }
}

wire_enum! {
    pub enum SensorOrientation {
        None = 0x00,
        Normal = 0x01,
        ReverseStart = 0x02,
        Reversed = 0x03,
    }
}

wire_enum! {
    /// Firmware update state reported in `Information` frames.
    pub enum ModeUpdate {
        None = 0x00,
        Ready = 0x01,
        Updating = 0x02,
        Complete = 0x03,
        Failed = 0x04,
        NotAvailable = 0x05,
        RunApplication = 0x06,
        NotRegistered = 0x07,
    }
}

wire_enum! {
    pub enum ButtonEvent {
        None = 0x00,
        Down = 0x01,
        Press = 0x02,
        Up = 0x03,
        EndContinuePress = 0x04,
    }
}

impl ButtonEvent {
    /// Display name used by controller input listings.
    pub fn name(self) -> &'static str {
        match self {
            ButtonEvent::None => "None_",
            ButtonEvent::Down => "Down",
            ButtonEvent::Press => "Press",
            ButtonEvent::Up => "Up",
            ButtonEvent::EndContinuePress => "EndContinuePress",
        }
    }
}

wire_enum! {
    /// Stick position: high nibble is the vertical band, low nibble horizontal.
    pub enum JoystickDirection {
        None = 0x00,
        VerticalTop = 0x10,
        VerticalMiddle = 0x20,
        VerticalBottom = 0x40,
        HorizontalLeft = 0x01,
        HorizontalMiddle = 0x02,
        HorizontalRight = 0x04,
        TopLeft = 0x11,
        TopMiddle = 0x12,
        TopRight = 0x14,
        MiddleLeft = 0x21,
        Center = 0x22,
        MiddleRight = 0x24,
        BottomLeft = 0x41,
        BottomMiddle = 0x42,
        BottomRight = 0x44,
    }
}

wire_enum! {
    pub enum JoystickEvent {
        None = 0x00,
        In = 0x01,
        Stay = 0x02,
        Out = 0x03,
    }
}

wire_enum! {
    pub enum BuzzerMode {
        Stop = 0x00,
        Mute = 0x01,
        MuteReserve = 0x02,
        Scale = 0x03,
        ScaleReserve = 0x04,
        Hz = 0x05,
        HzReserve = 0x06,
    }
}

wire_enum! {
    pub enum CommandType {
        None = 0x00,
        Stop = 0x01,
        ModeControlFlight = 0x02,
        Headless = 0x03,
        ControlSpeed = 0x04,
        ClearBias = 0x05,
        ClearTrim = 0x06,
        /// Option carries a flight event (take off, landing ...).
        FlightEvent = 0x07,
        SetDefault = 0x08,
        Backlight = 0x09,
        ModeController = 0x0A,
        Link = 0x0B,
        ClearCounter = 0xA0,
        NavigationTargetClear = 0xE0,
        NavigationStart = 0xE1,
        NavigationPause = 0xE2,
        NavigationRestart = 0xE3,
        NavigationStop = 0xE4,
        NavigationNext = 0xE5,
        NavigationReturnToHome = 0xE6,
        GpsRtkBase = 0xEA,
        GpsRtkRover = 0xEB,
    }
}

wire_enum! {
    pub enum DisplayPixel {
        Black = 0x00,
        White = 0x01,
        Inverse = 0x02,
        Outline = 0x03,
    }
}

wire_enum! {
    pub enum DisplayLine {
        Solid = 0x00,
        Dotted = 0x01,
        Dashed = 0x02,
    }
}

wire_enum! {
    pub enum DisplayFont {
        LiberationMono5x8 = 0x00,
        LiberationMono10x16 = 0x01,
    }
}
