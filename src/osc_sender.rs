use crate::types::*;
use crossbeam_channel::Receiver;
use log::{debug, error, info};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// Forwards note triggers and key light changes over OSC/UDP, so an external
/// sampler or visualizer can follow the session.
///
/// Addresses:
/// - `/piano/note  <kind:str> <ordinal:int> <index:int> <resting:int>` per trigger
/// - `/piano/key/<index>  <0|1>` whenever a key's pressed state changes
pub struct OscSender {
    rx: Receiver<PianoFrame>,
    target: String,
}

impl OscSender {
    pub fn new(rx: Receiver<PianoFrame>, target: String) -> Self {
        Self { rx, target }
    }

    /// Run the OSC sender loop. Blocks the calling thread.
    pub fn run(&self) {
        let socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to bind UDP socket: {}", e);
                return;
            }
        };
        info!("OSC sender → {}", self.target);

        let mut lit: Vec<bool> = Vec::new();
        for frame in self.rx.iter() {
            for packet in frame_packets(&frame, &mut lit) {
                if let Err(e) = self.send(&socket, &packet) {
                    debug!("OSC send error: {}", e);
                }
            }
        }
        info!("OSC sender shutting down");
    }

    fn send(&self, socket: &UdpSocket, packet: &OscPacket) -> Result<(), Box<dyn std::error::Error>> {
        let buf = rosc::encoder::encode(packet)?;
        socket.send_to(&buf, &self.target)?;
        Ok(())
    }
}

/// Packets for one frame. `lit` carries pressed state between frames so only
/// changes are sent.
fn frame_packets(frame: &PianoFrame, lit: &mut Vec<bool>) -> Vec<OscPacket> {
    let mut packets = Vec::new();

    for t in &frame.triggers {
        let kind = match t.key.kind {
            KeyKind::White => "white",
            KeyKind::Black => "black",
        };
        packets.push(OscPacket::Message(OscMessage {
            addr: "/piano/note".to_string(),
            args: vec![
                OscType::String(kind.to_string()),
                OscType::Int(t.key.ordinal as i32),
                OscType::Int(t.key.index as i32),
                OscType::Int(t.resting as i32),
            ],
        }));
    }

    if lit.len() != frame.pressed.len() {
        lit.resize(frame.pressed.len(), false);
    }
    for (i, (&now, was)) in frame.pressed.iter().zip(lit.iter_mut()).enumerate() {
        if now != *was {
            *was = now;
            packets.push(OscPacket::Message(OscMessage {
                addr: format!("/piano/key/{}", i),
                args: vec![OscType::Int(now as i32)],
            }));
        }
    }

    packets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(pressed: Vec<bool>, triggers: Vec<Trigger>) -> PianoFrame {
        PianoFrame {
            timestamp_us: 0,
            width: 700,
            height: 480,
            pressed,
            fingertips: vec![],
            triggers,
            draw: vec![],
        }
    }

    fn addrs(packets: &[OscPacket]) -> Vec<String> {
        packets
            .iter()
            .map(|p| match p {
                OscPacket::Message(m) => m.addr.clone(),
                OscPacket::Bundle(_) => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_trigger_and_light_change() {
        let mut lit = Vec::new();
        let key = KeyId::black(1, 8, 2.0);
        let mut pressed = vec![false; 12];
        pressed[8] = true;
        let packets = frame_packets(
            &frame(pressed.clone(), vec![Trigger { timestamp_us: 0, key, resting: false }]),
            &mut lit,
        );
        assert_eq!(addrs(&packets), vec!["/piano/note", "/piano/key/8"]);
        match &packets[0] {
            OscPacket::Message(m) => {
                assert_eq!(m.args[0], OscType::String("black".into()));
                assert_eq!(m.args[2], OscType::Int(8));
            }
            _ => panic!("expected message"),
        }

        // unchanged state sends nothing
        assert!(frame_packets(&frame(pressed, vec![]), &mut lit).is_empty());

        // release
        let packets = frame_packets(&frame(vec![false; 12], vec![]), &mut lit);
        assert_eq!(addrs(&packets), vec!["/piano/key/8"]);
    }
}
