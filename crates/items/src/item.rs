//! One parsed items.dat entry.

use bitflags::bitflags;
use gtbridge_proto::ByteReader;

const NAME_KEY: &[u8; 16] = b"PBG892FXX982ABC*";

bitflags! {
    /// Property bits from the item flags word.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ItemFlags: u16 {
        /// Places mirrored when facing left.
        const FLIPPABLE = 1 << 0;
        /// Carries editable extra data.
        const EDITABLE = 1 << 1;
        /// Never drops a seed.
        const SEEDLESS = 1 << 2;
        /// Cannot be broken.
        const PERMANENT = 1 << 3;
        /// Never drops itself.
        const DROPLESS = 1 << 4;
        /// Has no seed form.
        const NO_SELF = 1 << 5;
        /// Rendered without a drop shadow.
        const NO_SHADOW = 1 << 6;
        /// Locks the whole world.
        const WORLD_LOCKED = 1 << 7;
        /// Beta-only item.
        const BETA = 1 << 8;
        /// Picked up on touch.
        const AUTO_PICKUP = 1 << 9;
        /// Moderator-only item.
        const MOD = 1 << 10;
        /// Grows at a random rate.
        const RANDOM_GROW = 1 << 11;
        /// Usable by visitors.
        const PUBLIC = 1 << 12;
        /// Drawn in the foreground layer.
        const FOREGROUND = 1 << 13;
        /// Holiday-season item.
        const HOLIDAY = 1 << 14;
        /// Cannot be traded or dropped.
        const UNTRADEABLE = 1 << 15;
    }
}

/// One entry of the client item database, in wire field order.
///
/// Enum-like codes (`item_type`, `material`, collision and visual classes)
/// are kept raw; nothing in the proxy branches on them.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Sequential id; matches the entry index.
    pub id: u32,
    /// Property bits.
    pub flags: ItemFlags,
    /// Item class code.
    pub item_type: u8,
    /// Material class code.
    pub material: u8,
    /// Display name, decrypted.
    pub name: String,
    /// Sprite sheet the item renders from.
    pub texture_file: String,
    /// Content hash of that sprite sheet.
    pub texture_hash: u32,
    /// Visual effect code.
    pub visual_effect: u8,
    /// Cook time for oven recipes, seconds.
    pub cooking_time: u32,
    /// Sprite column.
    pub texture_x: u8,
    /// Sprite row.
    pub texture_y: u8,
    /// Sprite tiling mode.
    pub texture_type: u8,
    /// Wallpaper stripe toggle.
    pub stripey_wallpaper: u8,
    /// Collision class code.
    pub collision_type: u8,
    /// Punches needed to break.
    pub health: u8,
    /// Respawn delay after a break, seconds.
    pub reset_time: u32,
    /// Clothing slot code.
    pub clothing_type: u8,
    /// Rarity tier.
    pub rarity: u16,
    /// Stack limit.
    pub max_amount: u8,
    /// Auxiliary resource file.
    pub extra_file: String,
    /// Content hash of the auxiliary file.
    pub extra_file_hash: u32,
    /// Animation frame time, milliseconds.
    pub animation_time: u32,
    /// Pet battle name.
    pub pet_name: String,
    /// Pet battle prefix.
    pub pet_prefix: String,
    /// Pet battle suffix.
    pub pet_suffix: String,
    /// Pet battle ability text.
    pub pet_ability: String,
    /// Seed sprite base code.
    pub seed_base: u8,
    /// Seed sprite overlay code.
    pub seed_overlay: u8,
    /// Tree trunk sprite code.
    pub tree_base: u8,
    /// Tree leaf sprite code.
    pub tree_leaves: u8,
    /// Packed ARGB seed tint.
    pub seed_color: u32,
    /// Packed ARGB overlay tint.
    pub seed_overlay_color: u32,
    /// Splice ingredient encoding.
    pub ingredient: u32,
    /// Growth time, seconds.
    pub grow_time: u32,
    /// Packed render effect bits.
    pub fx_flags: u32,
    /// Frame list for multi-frame animation.
    pub animating_coordinates: String,
    /// Texture override used while animating.
    pub animating_texture_file: String,
    /// Secondary animation frame list.
    pub animating_coordinates_2: String,
    /// Unparsed field.
    pub unk1: u32,
    /// Unparsed field.
    pub unk2: u32,
    /// Packed secondary property bits.
    pub flags2: u32,
    /// Unparsed block.
    pub unk3: [u8; 60],
    /// Wrench interaction range, tiles.
    pub tile_range: u32,
    /// Vault slot capacity.
    pub vault_capacity: u32,
    /// Punch option text.
    pub punch_options: String,
    /// Unparsed field.
    pub unk4: u32,
    /// Body part indices for clothing.
    pub body_part_list: [u8; 9],
    /// Light emission range, tiles.
    pub light_range: u32,
    /// Unparsed field.
    pub unk5: u32,
    /// Whether avatars can sit on it.
    pub can_sit: u8,
    /// Seated avatar x offset.
    pub player_offset_x: u32,
    /// Seated avatar y offset.
    pub player_offset_y: u32,
    /// Chair overlay sprite column.
    pub chair_texture_x: u32,
    /// Chair overlay sprite row.
    pub chair_texture_y: u32,
    /// Chair leg x offset.
    pub chair_leg_offset_x: u32,
    /// Chair leg y offset.
    pub chair_leg_offset_y: u32,
    /// Chair overlay sprite sheet.
    pub chair_texture_file: String,
    /// Renderer parameter file.
    pub renderer_data_file: String,
    /// Unparsed field.
    pub unk6: u32,
    /// Content hash of the renderer file.
    pub renderer_data_file_hash: i32,
    /// Unparsed block.
    pub unk7: [u8; 9],
    /// Unparsed field.
    pub unk8: u16,
    /// Wrench description text.
    pub info: String,
    /// Splice ingredient item ids.
    pub ingredients: [u16; 2],
    /// Trailing byte present from version 24 on.
    pub unk9: u8,
}

impl Item {
    /// Reads one serialized item. `version` is the database header version.
    pub(crate) fn parse(reader: &mut ByteReader<'_>, version: u16) -> Option<Self> {
        let id = reader.read_u32()?;
        let flags = ItemFlags::from_bits_retain(reader.read_u16()?);
        let item_type = reader.read_u8()?;
        let material = reader.read_u8()?;

        let name_len = reader.read_u16()? as usize;
        let name_bytes = crypt_name(reader.read_bytes(name_len)?, id);
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let texture_file = reader.read_string_u16()?;
        let texture_hash = reader.read_u32()?;
        let visual_effect = reader.read_u8()?;
        let cooking_time = reader.read_u32()?;
        let texture_x = reader.read_u8()?;
        let texture_y = reader.read_u8()?;
        let texture_type = reader.read_u8()?;
        let stripey_wallpaper = reader.read_u8()?;
        let collision_type = reader.read_u8()?;
        let health = reader.read_u8()?;
        let reset_time = reader.read_u32()?;
        let clothing_type = reader.read_u8()?;
        let rarity = reader.read_u16()?;
        let max_amount = reader.read_u8()?;
        let extra_file = reader.read_string_u16()?;
        let extra_file_hash = reader.read_u32()?;
        let animation_time = reader.read_u32()?;
        let pet_name = reader.read_string_u16()?;
        let pet_prefix = reader.read_string_u16()?;
        let pet_suffix = reader.read_string_u16()?;
        let pet_ability = reader.read_string_u16()?;
        let seed_base = reader.read_u8()?;
        let seed_overlay = reader.read_u8()?;
        let tree_base = reader.read_u8()?;
        let tree_leaves = reader.read_u8()?;
        let seed_color = reader.read_u32()?;
        let seed_overlay_color = reader.read_u32()?;
        let ingredient = reader.read_u32()?;
        let grow_time = reader.read_u32()?;
        let fx_flags = reader.read_u32()?;
        let animating_coordinates = reader.read_string_u16()?;
        let animating_texture_file = reader.read_string_u16()?;
        let animating_coordinates_2 = reader.read_string_u16()?;
        let unk1 = reader.read_u32()?;
        let unk2 = reader.read_u32()?;
        let flags2 = reader.read_u32()?;
        let unk3: [u8; 60] = reader.read_bytes(60)?.try_into().ok()?;
        let tile_range = reader.read_u32()?;
        let vault_capacity = reader.read_u32()?;
        let punch_options = reader.read_string_u16()?;
        let unk4 = reader.read_u32()?;
        let body_part_list: [u8; 9] = reader.read_bytes(9)?.try_into().ok()?;
        let light_range = reader.read_u32()?;
        let unk5 = reader.read_u32()?;
        let can_sit = reader.read_u8()?;
        let player_offset_x = reader.read_u32()?;
        let player_offset_y = reader.read_u32()?;
        let chair_texture_x = reader.read_u32()?;
        let chair_texture_y = reader.read_u32()?;
        let chair_leg_offset_x = reader.read_u32()?;
        let chair_leg_offset_y = reader.read_u32()?;
        let chair_texture_file = reader.read_string_u16()?;
        let renderer_data_file = reader.read_string_u16()?;
        let unk6 = reader.read_u32()?;
        let renderer_data_file_hash = reader.read_i32()?;
        let unk7: [u8; 9] = reader.read_bytes(9)?.try_into().ok()?;
        let unk8 = reader.read_u16()?;
        let info = reader.read_string_u16()?;
        let ingredients = [reader.read_u16()?, reader.read_u16()?];
        let unk9 = if version >= 24 { reader.read_u8()? } else { 0 };

        Some(Self {
            id,
            flags,
            item_type,
            material,
            name,
            texture_file,
            texture_hash,
            visual_effect,
            cooking_time,
            texture_x,
            texture_y,
            texture_type,
            stripey_wallpaper,
            collision_type,
            health,
            reset_time,
            clothing_type,
            rarity,
            max_amount,
            extra_file,
            extra_file_hash,
            animation_time,
            pet_name,
            pet_prefix,
            pet_suffix,
            pet_ability,
            seed_base,
            seed_overlay,
            tree_base,
            tree_leaves,
            seed_color,
            seed_overlay_color,
            ingredient,
            grow_time,
            fx_flags,
            animating_coordinates,
            animating_texture_file,
            animating_coordinates_2,
            unk1,
            unk2,
            flags2,
            unk3,
            tile_range,
            vault_capacity,
            punch_options,
            unk4,
            body_part_list,
            light_range,
            unk5,
            can_sit,
            player_offset_x,
            player_offset_y,
            chair_texture_x,
            chair_texture_y,
            chair_leg_offset_x,
            chair_leg_offset_y,
            chair_texture_file,
            renderer_data_file,
            unk6,
            renderer_data_file_hash,
            unk7,
            unk8,
            info,
            ingredients,
            unk9,
        })
    }
}

/// XORs an item name against the rolling key. The cipher is symmetric, so
/// this both encrypts and decrypts.
pub(crate) fn crypt_name(bytes: &[u8], item_id: u32) -> Vec<u8> {
    let id = item_id as usize;
    bytes
        .iter()
        .enumerate()
        .map(|(i, byte)| byte ^ NAME_KEY[(i + id) % NAME_KEY.len()])
        .collect()
}
