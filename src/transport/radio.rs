//! Radio adapter contract: the concrete BLE central/peripheral stack is an
//! external collaborator (Non-goal of this crate), consumed only through
//! these narrow trait interfaces.
//!
//! [`CentralAdapter`] and [`PeripheralAdapter`] mirror the literal methods
//! listed in the external-interfaces section of the spec this crate
//! implements, so a concrete backend (CoreBluetooth, BlueZ, …) has an exact
//! contract to fill in. [`GattLink`] and [`L2capLink`] are the narrower,
//! uniform interfaces [`super::gatt`] and [`super::l2cap`] actually consume
//! — an adapter bridges the wide radio surface down to whichever of these
//! the negotiated transport needs.

use crate::core::{DeviceId, GhostDropError, TransportError};
use crate::frame::CapabilitiesPayload;

/// Ephemeral discovery record surfaced while scanning.
#[derive(Debug, Clone)]
pub struct NearbyDevice {
    /// The device's install identifier.
    pub id: DeviceId,
    /// Human-readable name for the pairing UI.
    pub display_name: String,
    /// Received signal strength, in dBm.
    pub rssi: i32,
    /// Capabilities advertised in the service-data payload.
    pub capabilities: CapabilitiesPayload,
    /// PSM to open an L2CAP CoC channel on, if advertised.
    pub l2cap_psm: Option<u16>,
}

/// The scanning/central half of the radio adapter.
pub trait CentralAdapter: Send {
    /// Resolve once the Bluetooth stack is powered on, or fail with
    /// `BluetoothUnavailable`/`BluetoothUnauthorized`.
    fn wait_until_powered_on(&self) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Begin scanning for nearby GhostDrop peripherals.
    fn start_scanning(&mut self) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Stop scanning.
    fn stop_scanning(&mut self) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Await the next nearby-device snapshot; `None` once scanning stops.
    fn next_nearby_devices(&mut self) -> impl Future<Output = Option<Vec<NearbyDevice>>> + Send;

    /// Open a GATT connection to `device`.
    fn connect(&mut self, device: DeviceId) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Discover the data/control/capabilities characteristics on `device`.
    fn discover_transport_characteristics(
        &mut self,
        device: DeviceId,
    ) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Read the capabilities characteristic, if discovery succeeded.
    fn advertised_capabilities(
        &mut self,
        device: DeviceId,
    ) -> impl Future<Output = Option<CapabilitiesPayload>> + Send;

    /// Open an L2CAP CoC channel on `psm`.
    fn open_l2cap(
        &mut self,
        device: DeviceId,
        psm: u16,
    ) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Write one GATT packet to `device`.
    fn write_packet(
        &mut self,
        bytes: &[u8],
        device: DeviceId,
        requires_response: bool,
    ) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// `true` if a write-without-response would not block.
    fn can_send_write_without_response(&self, device: DeviceId) -> impl Future<Output = bool> + Send;

    /// Resolve once write-without-response capacity is available again.
    fn wait_for_write_without_response_ready(&self, device: DeviceId) -> impl Future<Output = ()> + Send;

    /// Await the next raw packet received from `device`.
    fn next_incoming_packet(&mut self, device: DeviceId) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

/// The advertising/peripheral half of the radio adapter.
pub trait PeripheralAdapter: Send {
    /// Resolve once the Bluetooth stack is powered on.
    fn wait_until_powered_on(&self) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Begin advertising the GhostDrop service with `capabilities`, and the
    /// PSM of an accepted L2CAP listener, if any was opened.
    fn start_advertising(
        &mut self,
        capabilities: CapabilitiesPayload,
    ) -> impl Future<Output = Result<Option<u16>, GhostDropError>> + Send;

    /// Stop advertising.
    fn stop_advertising(&mut self) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Await the next write to the data/control characteristic.
    fn next_incoming_write_packet(&mut self) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Notify a packet on the data/control characteristic.
    fn notify_packet(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), GhostDropError>> + Send;

    /// Await the next incoming L2CAP CoC channel.
    fn next_incoming_l2cap_channel(&mut self) -> impl Future<Output = Option<()>> + Send;
}

/// The narrow packet-oriented interface [`super::gatt::GattTransport`]
/// consumes, bridging whichever side (central or peripheral) owns the
/// actual radio link.
pub trait GattLink: Send {
    /// Write one packet. Bulk fragments use `requires_response = false`;
    /// control fragments use `true`.
    fn write_packet(
        &self,
        bytes: &[u8],
        requires_response: bool,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// `true` if a write-without-response would not block right now.
    fn can_send_without_response(&self) -> impl Future<Output = bool> + Send;

    /// Resolve once write-without-response capacity is available.
    fn wait_for_write_without_response_ready(&self) -> impl Future<Output = ()> + Send;

    /// Await the next raw packet from the peer.
    fn next_incoming_packet(&self) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

/// The narrow byte-stream interface [`super::l2cap::L2capTransport`]
/// consumes.
pub trait L2capLink: Send {
    /// Write bytes to the channel; may block on peer credit.
    fn write(&self, bytes: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read the next chunk of bytes. Returns `Ok(vec![])` on clean EOF.
    fn read(&self) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}
