use bincode::{deserialize, serialize};
use shared::{Packet, StructureKind, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

/// Headless smoke client: connects to a running relay, walks through one
/// of each world-mutating message, and prints every packet it receives.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let server_addr = "127.0.0.1:8080".parse::<SocketAddr>()?;

    let connect_packet = Packet::Connect {
        client_version: PROTOCOL_VERSION,
    };
    println!("Sending connect to {}", server_addr);
    socket.send_to(&serialize(&connect_packet)?, server_addr).await?;

    let mut buf = [0u8; 8192];

    // Handshake: Connected, then InitWorld, then our vitals
    let (len, _) = socket.recv_from(&mut buf).await?;
    let session_id = match deserialize::<Packet>(&buf[0..len])? {
        Packet::Connected { session_id } => {
            println!("Connected with session id {}", session_id);
            session_id
        }
        Packet::Disconnected { reason } => {
            println!("Relay refused connection: {}", reason);
            return Ok(());
        }
        other => {
            println!("Expected Connected but got: {:?}", other);
            return Ok(());
        }
    };

    let (len, _) = socket.recv_from(&mut buf).await?;
    match deserialize::<Packet>(&buf[0..len])? {
        Packet::InitWorld {
            structures,
            containers,
        } => {
            println!(
                "World snapshot: {} structures, {} containers",
                structures.len(),
                containers.len()
            );
        }
        other => println!("Expected InitWorld but got: {:?}", other),
    }

    let (len, _) = socket.recv_from(&mut buf).await?;
    match deserialize::<Packet>(&buf[0..len])? {
        Packet::StatsUpdate { health, shield } => {
            println!("Vitals: health={}, shield={}", health, shield);
        }
        other => println!("Expected StatsUpdate but got: {:?}", other),
    }

    // Wander a little so other clients materialize us
    for i in 0..5 {
        let movement = Packet::Movement {
            x: i as f32 * 2.0,
            y: 10.0,
            z: 0.0,
            rotation: i as f32 * 0.2,
        };
        socket.send_to(&serialize(&movement)?, server_addr).await?;
        sleep(Duration::from_millis(200)).await;
    }

    // Place a wall, then tear it straight back down
    let build = Packet::Build {
        kind: StructureKind::Wall,
        x: 5.0,
        y: 0.0,
        z: 5.0,
        rotation: 0.0,
    };
    println!("Placing a wall");
    socket.send_to(&serialize(&build)?, server_addr).await?;

    let (len, _) = socket.recv_from(&mut buf).await?;
    if let Packet::StructureCreated { structure } = deserialize::<Packet>(&buf[0..len])? {
        println!("Relay assigned structure id {}", structure.id);

        let destroy = Packet::DestroyStructure {
            structure_id: structure.id,
        };
        socket.send_to(&serialize(&destroy)?, server_addr).await?;

        let (len, _) = socket.recv_from(&mut buf).await?;
        println!("Destroy echo: {:?}", deserialize::<Packet>(&buf[0..len])?);
    }

    // Try looting container 0; a second run of this client should see no
    // reply here since the container is already gone.
    let loot = Packet::Loot { container_id: 0 };
    println!("Looting container 0");
    socket.send_to(&serialize(&loot)?, server_addr).await?;

    match timeout(Duration::from_millis(500), socket.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => {
            println!("Loot echo: {:?}", deserialize::<Packet>(&buf[0..len])?)
        }
        _ => println!("No loot broadcast (container already looted)"),
    }

    println!("Session {} disconnecting", session_id);
    socket.send_to(&serialize(&Packet::Disconnect)?, server_addr).await?;

    println!("Test client finished");
    Ok(())
}
