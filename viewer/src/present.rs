use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::PrimaryWindow;

use crate::viewer::CloudViewer;

/// Texture the composited cloud frame is uploaded into.
#[derive(Resource)]
pub struct CloudTarget {
    pub image: Handle<Image>,
}

#[derive(Component)]
pub struct CloudSprite;

fn extent(width: u32, height: u32) -> Extent3d {
    Extent3d { width, height, depth_or_array_layers: 1 }
}

pub fn setup_target(mut commands: Commands, mut images: ResMut<Assets<Image>>, viewer: Option<Res<CloudViewer>>) {
    let Some(viewer) = viewer else {
        return;
    };
    let size = viewer.scene().presented().size();
    let image = Image::new_fill(
        extent(size.x, size.y),
        TextureDimension::D2,
        &[0, 0, 0, 255],
        TextureFormat::Rgba8UnormSrgb,
    );
    let handle = images.add(image);

    commands.spawn(Camera2dBundle::default());
    commands.spawn((
        SpriteBundle { texture: handle.clone(), ..default() },
        CloudSprite,
    ));
    commands.insert_resource(CloudTarget { image: handle });
}

/// Uploads the presented frame and stretches the sprite over the window.
pub fn present_frame(
    viewer: Res<CloudViewer>,
    target: Option<Res<CloudTarget>>,
    mut images: ResMut<Assets<Image>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut sprites: Query<&mut Sprite, With<CloudSprite>>,
    mut clear: ResMut<ClearColor>,
) {
    let Some(target) = target else {
        return;
    };
    let frame = viewer.scene().presented();
    if let Some(image) = images.get_mut(&target.image) {
        let size = extent(frame.width(), frame.height());
        if image.texture_descriptor.size != size {
            image.resize(size);
        }
        image.data = frame.to_rgba8();
    }

    if let Ok(window) = windows.get_single() {
        for mut sprite in &mut sprites {
            sprite.custom_size = Some(Vec2::new(window.width(), window.height()));
        }
    }

    let bg = viewer.scene().settings().render.background;
    let color = Color::rgba(bg.x, bg.y, bg.z, bg.w);
    if clear.0 != color {
        clear.0 = color;
    }
}
