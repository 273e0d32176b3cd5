//! USB device and receive tasks
//!
//! The device is a composite of three interfaces:
//!
//! - vendor interface with one bulk OUT endpoint carrying frame packets
//! - CDC-ACM serial carrying the byte-oriented pixel stream
//! - DFU runtime interface; a DFU_DETACH request asks for the bootloader

use defmt::*;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::{Driver, Endpoint, Out};
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, State};
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::driver::{Endpoint as _, EndpointError, EndpointOut as _};
use embassy_usb::{Builder, Config, Handler, UsbDevice};
use portable_atomic::Ordering;
use static_cell::StaticCell;

use blinkytile_core::intake::{PacketOutcome, UsbFrameReceiver, PACKET_SIZE};

use crate::channels::{BOOTLOADER_REQUEST, LED_COUNT, SERIAL_PIPE};

/// pid.codes test VID/PID
const USB_VID: u16 = 0x1209;
const USB_PID: u16 = 0x0001;

const USB_CLASS_VENDOR: u8 = 0xFF;
const USB_CLASS_APPLICATION: u8 = 0xFE;
const DFU_SUBCLASS: u8 = 0x01;
const DFU_PROTOCOL_RUNTIME: u8 = 0x01;

/// DFU functional descriptor type
const DFU_FUNCTIONAL: u8 = 0x21;

/// Will-detach and can-download, 1000ms detach timeout, 1024 byte
/// transfers, DFU 1.1
const DFU_FUNCTIONAL_BODY: [u8; 7] = [0x09, 0xE8, 0x03, 0x00, 0x04, 0x10, 0x01];

const DFU_DETACH: u8 = 0;
const DFU_GETSTATUS: u8 = 3;
const DFU_GETSTATE: u8 = 5;

/// appIDLE
const DFU_STATE_APP_IDLE: u8 = 0;

pub type UsbDriver = Driver<'static, USB>;

static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 64]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 64]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();
static DFU_HANDLER: StaticCell<DfuRuntimeHandler> = StaticCell::new();

/// Everything the USB tasks need
pub struct UsbParts {
    pub device: UsbDevice<'static, UsbDriver>,
    pub frames: Endpoint<'static, USB, Out>,
    pub serial: Receiver<'static, UsbDriver>,
}

impl UsbParts {
    /// Build the composite device on `driver`
    ///
    /// Must be called once; the descriptor buffers are static.
    pub fn build(driver: UsbDriver) -> Self {
        let mut config = Config::new(USB_VID, USB_PID);
        config.manufacturer = Some("BlinkyTile");
        config.product = Some("BlinkyTile Controller");
        config.max_power = 500;
        config.max_packet_size_0 = 64;
        // Required for the CDC interface association
        config.device_class = 0xEF;
        config.device_sub_class = 0x02;
        config.device_protocol = 0x01;
        config.composite_with_iads = true;

        let mut builder = Builder::new(
            driver,
            config,
            CONFIG_DESCRIPTOR.init([0; 256]),
            BOS_DESCRIPTOR.init([0; 64]),
            MSOS_DESCRIPTOR.init([0; 64]),
            CONTROL_BUF.init([0; 64]),
        );

        let frames = {
            let mut function = builder.function(USB_CLASS_VENDOR, 0, 0);
            let mut interface = function.interface();
            let mut alt = interface.alt_setting(USB_CLASS_VENDOR, 0, 0, None);
            alt.endpoint_bulk_out(None, PACKET_SIZE as u16)
        };

        let cdc = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), 64);
        // Nothing is sent back over serial
        let (_tx, serial) = cdc.split();

        let dfu_interface = {
            let mut function =
                builder.function(USB_CLASS_APPLICATION, DFU_SUBCLASS, DFU_PROTOCOL_RUNTIME);
            let mut interface = function.interface();
            let number = interface.interface_number();
            let mut alt = interface.alt_setting(
                USB_CLASS_APPLICATION,
                DFU_SUBCLASS,
                DFU_PROTOCOL_RUNTIME,
                None,
            );
            alt.descriptor(DFU_FUNCTIONAL, &DFU_FUNCTIONAL_BODY);
            number.0
        };
        builder.handler(DFU_HANDLER.init(DfuRuntimeHandler {
            interface: dfu_interface,
        }));

        Self {
            device: builder.build(),
            frames,
            serial,
        }
    }
}

/// Answers DFU runtime requests on the DFU interface
struct DfuRuntimeHandler {
    interface: u8,
}

impl DfuRuntimeHandler {
    fn accepts(&self, req: &Request) -> bool {
        req.request_type == RequestType::Class
            && req.recipient == Recipient::Interface
            && req.index == u16::from(self.interface)
    }
}

impl Handler for DfuRuntimeHandler {
    fn control_out(&mut self, req: Request, _data: &[u8]) -> Option<OutResponse> {
        if !self.accepts(&req) {
            return None;
        }
        match req.request {
            DFU_DETACH => {
                info!("DFU detach requested");
                BOOTLOADER_REQUEST.store(true, Ordering::Release);
                Some(OutResponse::Accepted)
            }
            _ => Some(OutResponse::Rejected),
        }
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if !self.accepts(&req) {
            return None;
        }
        match req.request {
            DFU_GETSTATUS if buf.len() >= 6 => {
                // OK status, no poll timeout, appIDLE, no string
                buf[..6].copy_from_slice(&[0, 0, 0, 0, DFU_STATE_APP_IDLE, 0]);
                Some(InResponse::Accepted(&buf[..6]))
            }
            DFU_GETSTATE if !buf.is_empty() => {
                buf[0] = DFU_STATE_APP_IDLE;
                Some(InResponse::Accepted(&buf[..1]))
            }
            _ => Some(InResponse::Rejected),
        }
    }
}

/// USB device task - runs the device state machine
#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB task started");
    device.run().await
}

/// Frame receive task - assembles bulk packets into the frame mailbox
#[embassy_executor::task]
pub async fn frame_rx_task(
    mut endpoint: Endpoint<'static, USB, Out>,
    mut receiver: UsbFrameReceiver<'static, LED_COUNT>,
) -> ! {
    info!("Frame RX task started");

    let mut packet = [0u8; PACKET_SIZE];
    loop {
        endpoint.wait_enabled().await;
        debug!("Frame endpoint enabled");

        loop {
            match endpoint.read(&mut packet).await {
                Ok(n) => match receiver.handle_packet(&packet[..n]) {
                    PacketOutcome::Published { replaced: true } => {
                        trace!("Frame published over an untaken one");
                    }
                    PacketOutcome::Published { replaced: false } | PacketOutcome::Partial => {}
                    PacketOutcome::Ignored => {
                        trace!("Ignored packets: {}", receiver.ignored());
                    }
                },
                Err(EndpointError::Disabled) => {
                    debug!("Frame endpoint disabled");
                    break;
                }
                Err(EndpointError::BufferOverflow) => {
                    warn!("Frame packet overflow");
                }
            }
        }
    }
}

/// Serial receive task - forwards CDC-ACM payload into the serial pipe
#[embassy_executor::task]
pub async fn serial_rx_task(mut serial: Receiver<'static, UsbDriver>) -> ! {
    info!("Serial RX task started");

    let mut buf = [0u8; 64];
    loop {
        serial.wait_connection().await;
        debug!("Serial connected");

        loop {
            match serial.read_packet(&mut buf).await {
                Ok(n) => SERIAL_PIPE.write_all(&buf[..n]).await,
                Err(EndpointError::Disabled) => {
                    debug!("Serial disconnected");
                    break;
                }
                Err(EndpointError::BufferOverflow) => {
                    warn!("Serial packet overflow");
                }
            }
        }
    }
}
