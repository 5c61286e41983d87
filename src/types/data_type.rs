//! Data kind and device identifiers carried in every frame header.

use crate::error::ProtocolError;

wire_enum! {
    /// Payload discriminator selecting a schema and routing target.
    pub enum DataType invalid = ProtocolError::UnknownKind; {
        None = 0x00,
        Ping = 0x01,
        Ack = 0x02,
        Error = 0x03,
        Request = 0x04,
        Message = 0x05,
        Address = 0x06,
        Information = 0x07,
        UpdateLocation = 0x09,
        SystemInformation = 0x0C,
        Registration = 0x0D,
        /// Flight control set-points (Quad8 sticks or position targets).
        Control = 0x10,
        Command = 0x11,
        Pairing = 0x12,
        Rssi = 0x13,
        LightManual = 0x20,
        LightMode = 0x21,
        LightEvent = 0x22,
        LightDefault = 0x23,
        RawMotion = 0x30,
        RawFlow = 0x31,
        State = 0x40,
        Attitude = 0x41,
        Position = 0x42,
        Altitude = 0x43,
        Motion = 0x44,
        Range = 0x45,
        Flow = 0x46,
        Count = 0x50,
        Bias = 0x51,
        Trim = 0x52,
        Weight = 0x53,
        Buzzer = 0x62,
        Button = 0x70,
        Joystick = 0x71,
        DisplayClear = 0x80,
        DisplayInvert = 0x81,
        DisplayDrawPoint = 0x82,
        DisplayDrawLine = 0x83,
        DisplayDrawRect = 0x84,
        DisplayDrawCircle = 0x85,
        DisplayDrawString = 0x86,
        CardClassify = 0x90,
        CardRange = 0x91,
        CardRaw = 0x92,
        CardColor = 0x93,
        CardList = 0x94,
        CardFunctionList = 0x95,
        InformationAssembledForController = 0xA0,
        InformationAssembledForEntry = 0xA1,
    }
}

wire_enum! {
    /// Logical device addressed by a frame.
    pub enum DeviceType invalid = ProtocolError::UnknownDevice; {
        None = 0x00,
        Drone = 0x10,
        Controller = 0x20,
        Link = 0x30,
        LinkServer = 0x31,
        BleClient = 0x32,
        BleServer = 0x33,
        Range = 0x40,
        /// The host computer.
        Base = 0x70,
        ByScratch = 0x80,
        Scratch = 0x81,
        Entry = 0x82,
        Tester = 0xA0,
        Monitor = 0xA1,
        Updater = 0xA2,
        Encryptor = 0xA3,
        Whispering = 0xFE,
        Broadcasting = 0xFF,
    }
}

impl DataType {
    /// Whether the drone sends this kind back when asked with a `Request` frame.
    pub fn is_requestable(self) -> bool {
        matches!(
            self,
            DataType::Address
                | DataType::Information
                | DataType::Rssi
                | DataType::RawMotion
                | DataType::RawFlow
                | DataType::State
                | DataType::Attitude
                | DataType::Position
                | DataType::Altitude
                | DataType::Motion
                | DataType::Range
                | DataType::Flow
                | DataType::Count
                | DataType::Trim
                | DataType::Error
                | DataType::CardColor
                | DataType::Button
                | DataType::Joystick
        )
    }
}
