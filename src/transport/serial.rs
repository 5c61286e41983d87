//! Serial port access for the CoDrone EDU controller.

use tokio_serial::{
    DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialPortType, SerialStream, StopBits,
};
use tracing::{debug, info};

use crate::{DroneError, Result};

/// Controller link speed.
pub const BAUD_RATE: u32 = 115_200;

/// USB vendor id of the controller's serial bridge.
pub const CONTROLLER_VID: u16 = 1155;

/// Open `port` at `baud`, 8N1 with no flow control.
pub fn open(port: &str, baud: u32) -> Result<SerialStream> {
    info!("Opening serial port {} at {} baud", port, baud);
    tokio_serial::new(port, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|e| {
            DroneError::transport_failed_with_source(
                format!("failed to open {port}"),
                std::io::Error::from(e),
            )
        })
}

/// Find the first USB serial port whose vendor id matches the controller.
pub fn find_controller_port() -> Result<String> {
    let ports = tokio_serial::available_ports().map_err(|e| DroneError::PortNotFound {
        details: format!("could not enumerate serial ports: {e}"),
    })?;

    for port in &ports {
        if let SerialPortType::UsbPort(usb) = &port.port_type {
            debug!("USB serial port {} vid={:#06x} pid={:#06x}", port.port_name, usb.vid, usb.pid);
            if usb.vid == CONTROLLER_VID {
                info!("Found controller on {}", port.port_name);
                return Ok(port.port_name.clone());
            }
        }
    }

    Err(DroneError::PortNotFound {
        details: format!("none of {} serial ports has vendor id {CONTROLLER_VID}", ports.len()),
    })
}
