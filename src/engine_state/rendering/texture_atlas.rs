//! Texture atlas packing for opaque block textures.
//!
//! Every opaque block type gets a stable sequential id, assigned by sorting the types by
//! name. Ids are laid out row-major in a grid with a fixed number of columns; the number
//! of rows is `ceil(count / columns)`. A face's UVs are the unit-quad UVs scaled by
//! `(1/columns, 1/rows)` and offset by the block's grid cell.
//!
//! Missing texture files never fail packing: the cell is filled with the block's
//! fallback colour and the block's vertices carry that colour.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use image::{imageops, Rgba, RgbaImage};
use log::{debug, warn};

use crate::engine_state::voxels::block::block_type::BlockType;

/// Atlas layout, plus the packed image when textures were loaded.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    columns: u32,
    rows: u32,
    cells: HashMap<BlockType, u32>,
    textured: HashSet<BlockType>,
    image: Option<RgbaImage>,
}

impl TextureAtlas {
    /// Computes the grid layout without loading any image data.
    pub fn layout(columns: u32) -> Self {
        let columns = columns.max(1);
        let mut types: Vec<BlockType> = BlockType::all().filter(|t| t.is_opaque()).collect();
        types.sort_by_key(|t| t.name());

        let cells: HashMap<BlockType, u32> = types
            .into_iter()
            .enumerate()
            .map(|(id, block_type)| (block_type, id as u32))
            .collect();
        let rows = (cells.len() as u32).div_ceil(columns).max(1);

        TextureAtlas {
            columns,
            rows,
            cells,
            textured: HashSet::new(),
            image: None,
        }
    }

    /// Packs `<texture_dir>/<name>.png` for every opaque block into one RGBA image.
    ///
    /// Textures are resized to `tile_size` square tiles. A file that is missing or fails
    /// to decode is logged and replaced by a tile of the block's fallback colour.
    pub fn load(texture_dir: &Path, columns: u32, tile_size: u32) -> Self {
        let mut atlas = Self::layout(columns);
        let tile_size = tile_size.max(1);
        let mut image = RgbaImage::new(atlas.columns * tile_size, atlas.rows * tile_size);

        let mut entries: Vec<(BlockType, u32)> =
            atlas.cells.iter().map(|(t, id)| (*t, *id)).collect();
        entries.sort_by_key(|(_, id)| *id);

        for (block_type, id) in entries {
            let path = texture_dir.join(format!("{}.png", block_type.name()));
            let tile = match image::open(&path) {
                Ok(texture) => {
                    atlas.textured.insert(block_type);
                    imageops::resize(
                        &texture.to_rgba8(),
                        tile_size,
                        tile_size,
                        imageops::FilterType::Nearest,
                    )
                }
                Err(err) => {
                    warn!(
                        "Texture for `{}` unavailable ({}): using fallback colour",
                        block_type, err
                    );
                    RgbaImage::from_pixel(tile_size, tile_size, Rgba(block_type.fallback_color()))
                }
            };
            let (column, row) = atlas.grid_cell(id);
            imageops::replace(
                &mut image,
                &tile,
                (column * tile_size) as i64,
                (row * tile_size) as i64,
            );
        }

        debug!(
            "Packed texture atlas {}x{} cells, {} textured",
            atlas.columns,
            atlas.rows,
            atlas.textured.len()
        );
        atlas.image = Some(image);
        atlas
    }

    /// Number of grid columns.
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of grid rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// The sequential atlas id of a block type, if it is packed.
    pub fn id_of(&self, block_type: BlockType) -> Option<u32> {
        self.cells.get(&block_type).copied()
    }

    /// Whether a real texture (not a fallback colour) was packed for the type.
    pub fn is_textured(&self, block_type: BlockType) -> bool {
        self.textured.contains(&block_type)
    }

    /// The packed atlas image, if textures were loaded.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    fn grid_cell(&self, id: u32) -> (u32, u32) {
        (id % self.columns, id / self.columns)
    }

    /// Maps a unit-quad UV into the block type's atlas cell.
    ///
    /// Types without a cell keep the unit-quad UV.
    pub fn map_uv(&self, block_type: BlockType, uv: [f32; 2]) -> [f32; 2] {
        let Some(id) = self.id_of(block_type) else {
            return uv;
        };
        let (column, row) = self.grid_cell(id);
        let scale_u = 1.0 / self.columns as f32;
        let scale_v = 1.0 / self.rows as f32;
        [
            uv[0] * scale_u + column as f32 * scale_u,
            uv[1] * scale_v + row as f32 * scale_v,
        ]
    }
}
