#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    ai_vdr_desktop_lib::run();
}
