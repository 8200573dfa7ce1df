//! Radio collaborators. The transceiver drivers implement these; the framers
//! only ever see raw bytes.

use heapless::Vec;

/// Largest payload a single radio packet can carry (LoRa FIFO size).
pub const MAX_PAYLOAD_LEN: usize = 255;

pub type Payload = Vec<u8, MAX_PAYLOAD_LEN>;

/// Flight-side transmitter.
pub trait RadioTx {
    /// Starts sending `bytes`. Returns `false` if the radio refused the packet.
    fn send(&mut self, bytes: &[u8]) -> bool;

    /// `true` while a previous `send` is still on air.
    fn is_busy(&self) -> bool {
        false
    }
}

impl<R: RadioTx + ?Sized> RadioTx for &mut R {
    fn send(&mut self, bytes: &[u8]) -> bool {
        (**self).send(bytes)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }
}

/// One packet pulled from the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxPacket {
    pub payload: Payload,
    /// Received signal strength in dBm.
    pub rssi: i16,
}

impl RxPacket {
    /// Copies `bytes` into a packet, or `None` if they exceed one radio frame.
    pub fn new(bytes: &[u8], rssi: i16) -> Option<Self> {
        Some(Self {
            payload: Vec::from_slice(bytes).ok()?,
            rssi,
        })
    }
}

/// Ground-side receiver, polled without blocking.
pub trait RadioRx {
    fn try_receive(&mut self) -> Option<RxPacket>;
}

impl<R: RadioRx + ?Sized> RadioRx for &mut R {
    fn try_receive(&mut self) -> Option<RxPacket> {
        (**self).try_receive()
    }
}
