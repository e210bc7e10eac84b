fn main() {
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=MQTT_BROKER");
    println!("cargo:rerun-if-env-changed=MQTT_CLIENT_ID");
}
