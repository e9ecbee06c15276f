//! randomized checks of the operation laws

use proptest::prelude::*;

use super::fs_layout::Volume;
use super::geometry::Geometry;

fn arb_geometry() -> impl Strategy<Value = Geometry> {
    prop_oneof![
        Just(Geometry::new(32, 12, 256, 8).unwrap()),
        Just(Geometry::new(64, 12, 65_536, 24).unwrap()),
        Just(Geometry::new(20, 12, 1_310_800, 5).unwrap()),
    ]
}

/// a geometry plus a payload that fits its free blocks
fn arb_case() -> impl Strategy<Value = (Geometry, Vec<u8>)> {
    arb_geometry().prop_flat_map(|geometry| {
        let capacity =
            (geometry.block_count() as usize - 1) * geometry.actual_space_per_block();
        let data = prop::collection::vec(any::<u8>(), 0..=capacity.min(2048));
        (Just(geometry), data)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn write_then_read_returns_the_same_bytes((geometry, data) in arb_case()) {
        let mut volume = Volume::format(geometry).unwrap();
        volume.write_file_bytes("V:\\f", &data).unwrap();
        prop_assert_eq!(volume.read_file_bytes("V:\\f").unwrap(), data.clone());
        prop_assert_eq!(volume.get_file("V:\\f").unwrap().size, data.len() as u64);
    }

    #[test]
    fn deleting_a_file_restores_free_space((geometry, data) in arb_case()) {
        let mut volume = Volume::format(geometry).unwrap();
        let free_before = volume.free_space();
        volume.write_file_bytes("V:\\f", &data).unwrap();
        volume.delete_file("V:\\f").unwrap();
        prop_assert_eq!(volume.free_space(), free_before);
        prop_assert!(!volume.exists_file("V:\\f").unwrap());
    }

    #[test]
    fn a_reloaded_image_answers_like_the_original((geometry, data) in arb_case()) {
        let mut volume = Volume::format(geometry).unwrap();
        volume.write_file_bytes("V:\\f", &data).unwrap();

        let reloaded = Volume::from_bytes(volume.save_to_buffer()).unwrap();
        prop_assert_eq!(reloaded.read_file_bytes("V:\\f").unwrap(), data);
        prop_assert_eq!(reloaded.free_space(), volume.free_space());
        prop_assert_eq!(reloaded.list_files("V:\\").unwrap(), volume.list_files("V:\\").unwrap());
    }
}
