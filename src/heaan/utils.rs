use rand::Rng;

#[allow(dead_code)]
pub(crate) fn equal_up_to_epsilon(nums1: &[f64], nums2: &[f64], epsilon: f64) -> bool {
    nums1.len() == nums2.len()
        && nums1
            .iter()
            .zip(nums2.iter())
            .all(|(x1, x2)| (x1 - x2).abs() <= epsilon)
}

#[allow(dead_code)]
pub(crate) fn gen_random_vector(length: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..length).map(|_| rng.gen_range(-1.0..1.0)).collect()
}
