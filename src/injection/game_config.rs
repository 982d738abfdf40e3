use crate::injection::error::InjectionError;
use log::info;
use std::fs;
use std::path::Path;

// Game.cfg management: the game only loads overlays with EnableMods=1

pub fn enable_mods_in_game_cfg(game_path: &Path) -> Result<(), InjectionError> {
    let game_cfg_path = game_path.join("Game.cfg");

    if !game_cfg_path.exists() {
        fs::write(&game_cfg_path, "[General]\nEnableMods=1\n")?;
        info!("[Injector] Created Game.cfg with EnableMods=1");
        return Ok(());
    }

    let content = fs::read_to_string(&game_cfg_path)?;
    if content.contains("EnableMods=1") {
        return Ok(());
    }

    let new_content = if content.contains("EnableMods=0") {
        content.replace("EnableMods=0", "EnableMods=1")
    } else if let Some((head, tail)) = content.split_once("[General]") {
        format!("{}[General]\nEnableMods=1{}", head, tail)
    } else {
        format!("{}\n[General]\nEnableMods=1\n", content)
    };

    fs::write(&game_cfg_path, new_content)?;
    info!("[Injector] Updated Game.cfg to enable mods");
    Ok(())
}
