use chrono::{TimeZone, Utc};
use serde_json::Value;
use sysmon::core::system_monitor::{DiskReading, MemoryReading, NetworkReading, Snapshot};

fn sample() -> Snapshot {
    Snapshot {
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap(),
        cpu_usage_pct: 37.5,
        memory: MemoryReading {
            total_gb: 15.6,
            used_gb: 9.4,
            free_gb: 6.2,
            usage_pct: 60.3,
        },
        disks: vec![DiskReading {
            name: "C:\\".to_string(),
            total_gb: 476.3,
            used_gb: 301.2,
            free_gb: 175.1,
        }],
        networks: vec![NetworkReading {
            name: "Ethernet".to_string(),
            bytes_sent: 1_234_567,
            bytes_received: 98_765_432,
            send_rate: 2048.5,
            recv_rate: 4096.25,
            packet_loss_pct: 25.0,
            latency_ms: 18.3,
            is_connected: true,
            bandwidth_usage_pct: 0.1,
        }],
    }
}

#[test]
fn test_wire_roundtrip_is_exact() {
    let snapshot = sample();
    let json = serde_json::to_string(&snapshot).unwrap();
    let decoded: Snapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded, snapshot);
}

#[test]
fn test_wire_uses_camel_case_keys() {
    let value = serde_json::to_value(sample()).unwrap();
    let object = value.as_object().unwrap();

    for key in [
        "timestamp",
        "cpuUsagePercentage",
        "memoryUsagePercentage",
        "totalMemoryGB",
        "usedMemoryGB",
        "freeMemoryGB",
        "diskMetrics",
        "networkMetrics",
    ] {
        assert!(object.contains_key(key), "missing {key}");
    }

    let disk = &value["diskMetrics"][0];
    assert_eq!(disk["driveName"], Value::from("C:\\"));
    assert_eq!(disk["totalSpaceGB"], Value::from(476.3));
    assert_eq!(disk["usedSpaceGB"], Value::from(301.2));
    assert_eq!(disk["freeSpaceGB"], Value::from(175.1));

    let network = &value["networkMetrics"][0];
    assert_eq!(network["interfaceName"], Value::from("Ethernet"));
    assert_eq!(network["bytesSent"], Value::from(1_234_567u64));
    assert_eq!(network["bytesReceived"], Value::from(98_765_432u64));
    assert_eq!(network["sendSpeed"], Value::from(2048.5));
    assert_eq!(network["receiveSpeed"], Value::from(4096.25));
    assert_eq!(network["packetLoss"], Value::from(25.0));
    assert_eq!(network["latency"], Value::from(18.3));
    assert_eq!(network["isConnected"], Value::Bool(true));
    assert_eq!(network["bandwidthUsagePercentage"], Value::from(0.1));
}

#[test]
fn test_decode_external_payload() {
    let payload = r#"{
        "timestamp": "2024-05-01T12:30:15Z",
        "cpuUsagePercentage": 12.0,
        "memoryUsagePercentage": 50.0,
        "totalMemoryGB": 8.0,
        "usedMemoryGB": 4.0,
        "freeMemoryGB": 4.0,
        "diskMetrics": [],
        "networkMetrics": []
    }"#;

    let snapshot: Snapshot = serde_json::from_str(payload).unwrap();
    assert_eq!(snapshot.cpu_usage_pct, 12.0);
    assert_eq!(snapshot.memory.total_gb, 8.0);
    assert_eq!(snapshot.timestamp, sample().timestamp);
}
