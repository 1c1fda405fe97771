//! A module for embedded Gauss-Kronrod quadrature rule pairs.
//!
//! A Gauss-Kronrod pair extends an `order`-point Gauss-Legendre rule with
//! `order + 1` additional nodes into a `2 * order + 1`-point Kronrod rule
//! sharing the Gauss nodes, so that a single batch of function evaluations
//! yields both an integral estimate and an error estimate.
//!
//! The following pairs are implemented:
//! * G3K7: 3-point Gauss / 7-point Kronrod,
//! * G7K15: 7-point Gauss / 15-point Kronrod,
//! * G15K31: 15-point Gauss / 31-point Kronrod.
//!
//! Coefficients follow QUADPACK `dqk15`/`dqk31` and Kronrod's published
//! extension of the 3-point Gauss rule.

/// The closed enumeration of available embedded pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GaussKronrodPair {
    /// 3-point Gauss rule embedded in a 7-point Kronrod rule
    G3K7,
    /// 7-point Gauss rule embedded in a 15-point Kronrod rule
    G7K15,
    /// 15-point Gauss rule embedded in a 31-point Kronrod rule
    G15K31,
}

/// Positive Kronrod nodes of the G3K7 pair, in increasing order.
/// Nodes at odd indices are the positive Gauss nodes.
const G3K7_NODES: [f64; 3] = [
    0.434_243_749_346_802_558_002_071_502_844_628,
    0.774_596_669_241_483_377_035_853_079_956_480,
    0.960_491_268_708_020_283_423_507_092_629_080,
];
const G3K7_ZERO_KRONROD_WEIGHT: f64 = 0.450_916_538_658_474_142_345_110_087_045_570;
const G3K7_KRONROD_WEIGHTS: [f64; 3] = [
    0.401_397_414_775_962_222_905_051_818_618_432,
    0.268_488_089_868_333_440_728_569_280_666_710,
    0.104_656_226_026_467_265_193_823_857_192_073,
];
const G3K7_ZERO_GAUSS_WEIGHT: f64 = 0.888_888_888_888_888_888_888_888_888_888_889;
const G3K7_GAUSS_WEIGHTS: [f64; 1] = [0.555_555_555_555_555_555_555_555_555_555_556];

const G7K15_NODES: [f64; 7] = [
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.586_087_235_467_691_130_294_144_838_258_730,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.991_455_371_120_812_639_206_854_697_526_329,
];
const G7K15_ZERO_KRONROD_WEIGHT: f64 = 0.209_482_141_084_727_828_012_999_174_891_714;
const G7K15_KRONROD_WEIGHTS: [f64; 7] = [
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.022_935_322_010_529_224_963_732_008_058_970,
];
const G7K15_ZERO_GAUSS_WEIGHT: f64 = 0.417_959_183_673_469_387_755_102_040_816_327;
const G7K15_GAUSS_WEIGHTS: [f64; 3] = [
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.129_484_966_168_869_693_270_611_432_679_082,
];

const G15K31_NODES: [f64; 15] = [
    0.101_142_066_918_717_499_027_074_231_447_392,
    0.201_194_093_997_434_522_300_628_303_394_596,
    0.299_180_007_153_168_812_166_780_024_266_389,
    0.394_151_347_077_563_369_897_207_370_981_045,
    0.485_081_863_640_239_680_693_655_740_232_351,
    0.570_972_172_608_538_847_537_226_737_253_911,
    0.650_996_741_297_416_970_533_735_895_313_275,
    0.724_417_731_360_170_047_416_186_054_613_938,
    0.790_418_501_442_465_932_967_649_294_817_947,
    0.848_206_583_410_427_216_200_648_320_774_217,
    0.897_264_532_344_081_900_882_509_656_454_496,
    0.937_273_392_400_705_904_307_758_947_710_209,
    0.967_739_075_679_139_134_257_347_978_784_337,
    0.987_992_518_020_485_428_489_565_718_586_613,
    0.998_002_298_693_397_060_285_172_840_152_271,
];
const G15K31_ZERO_KRONROD_WEIGHT: f64 = 0.101_330_007_014_791_549_017_374_792_767_493;
const G15K31_KRONROD_WEIGHTS: [f64; 15] = [
    0.100_769_845_523_875_595_044_946_662_617_570,
    0.099_173_598_721_791_959_332_393_173_484_603,
    0.096_642_726_983_623_678_505_179_907_627_589,
    0.093_126_598_170_825_321_225_486_872_747_346,
    0.088_564_443_056_211_770_647_275_443_693_774,
    0.083_080_502_823_133_021_038_289_247_286_104,
    0.076_849_680_757_720_378_894_432_777_482_659,
    0.069_854_121_318_728_258_709_520_077_099_147,
    0.062_009_567_800_670_640_285_139_230_960_803,
    0.053_481_524_690_928_087_265_343_147_239_430,
    0.044_589_751_324_764_876_608_227_299_373_280,
    0.035_346_360_791_375_846_222_037_948_478_360,
    0.025_460_847_326_715_320_186_874_001_019_653,
    0.015_007_947_329_316_122_538_374_763_075_807,
    0.005_377_479_872_923_348_987_792_051_430_128,
];
const G15K31_ZERO_GAUSS_WEIGHT: f64 = 0.202_578_241_925_561_272_880_620_199_967_519;
const G15K31_GAUSS_WEIGHTS: [f64; 7] = [
    0.198_431_485_327_111_576_456_118_326_443_839,
    0.186_161_000_015_562_211_026_800_561_866_423,
    0.166_269_205_816_993_933_553_200_860_481_209,
    0.139_570_677_926_154_314_447_804_794_511_028,
    0.107_159_220_467_171_935_011_869_546_685_869,
    0.070_366_047_488_108_124_709_267_416_450_667,
    0.030_753_241_996_117_268_354_628_393_577_204,
];

/// An immutable table of Gauss-Kronrod abscissas and weights on `[-1, 1]`.
///
/// `order` is the number of strictly positive Kronrod nodes; the full rule
/// evaluates `2 * order + 1` points: the interval midpoint plus a symmetric
/// pair per positive node. The embedded Gauss rule uses the midpoint and the
/// nodes at odd indices of [`GaussKronrodRule::other_kronrod_nodes`].
#[derive(Clone, Debug)]
pub struct GaussKronrodRule {
    order: usize,
    zero_gauss_weight: f64,
    other_gauss_weights: &'static [f64],
    other_kronrod_nodes: &'static [f64],
    zero_kronrod_weight: f64,
    other_kronrod_weights: &'static [f64],
}

impl GaussKronrodRule {
    /// Build the rule table for one of the embedded pairs.
    pub fn new(pair: GaussKronrodPair) -> Self {
        match pair {
            GaussKronrodPair::G3K7 => GaussKronrodRule {
                order: 3,
                zero_gauss_weight: G3K7_ZERO_GAUSS_WEIGHT,
                other_gauss_weights: &G3K7_GAUSS_WEIGHTS,
                other_kronrod_nodes: &G3K7_NODES,
                zero_kronrod_weight: G3K7_ZERO_KRONROD_WEIGHT,
                other_kronrod_weights: &G3K7_KRONROD_WEIGHTS,
            },
            GaussKronrodPair::G7K15 => GaussKronrodRule {
                order: 7,
                zero_gauss_weight: G7K15_ZERO_GAUSS_WEIGHT,
                other_gauss_weights: &G7K15_GAUSS_WEIGHTS,
                other_kronrod_nodes: &G7K15_NODES,
                zero_kronrod_weight: G7K15_ZERO_KRONROD_WEIGHT,
                other_kronrod_weights: &G7K15_KRONROD_WEIGHTS,
            },
            GaussKronrodPair::G15K31 => GaussKronrodRule {
                order: 15,
                zero_gauss_weight: G15K31_ZERO_GAUSS_WEIGHT,
                other_gauss_weights: &G15K31_GAUSS_WEIGHTS,
                other_kronrod_nodes: &G15K31_NODES,
                zero_kronrod_weight: G15K31_ZERO_KRONROD_WEIGHT,
                other_kronrod_weights: &G15K31_KRONROD_WEIGHTS,
            },
        }
    }

    /// Number of strictly positive Kronrod nodes
    pub fn order(&self) -> usize {
        self.order
    }

    /// Total number of evaluation points of the Kronrod rule
    pub fn npoints(&self) -> usize {
        2 * self.order + 1
    }

    /// Gauss weight of the midpoint node
    pub fn zero_gauss_weight(&self) -> f64 {
        self.zero_gauss_weight
    }

    /// Gauss weights of the positive Gauss nodes, `(order - 1) / 2` values
    /// paired with the nodes at odd indices of `other_kronrod_nodes`
    pub fn other_gauss_weights(&self) -> &[f64] {
        self.other_gauss_weights
    }

    /// Strictly positive Kronrod nodes in increasing order
    pub fn other_kronrod_nodes(&self) -> &[f64] {
        self.other_kronrod_nodes
    }

    /// Kronrod weight of the midpoint node
    pub fn zero_kronrod_weight(&self) -> f64 {
        self.zero_kronrod_weight
    }

    /// Kronrod weights paired with `other_kronrod_nodes`
    pub fn other_kronrod_weights(&self) -> &[f64] {
        self.other_kronrod_weights
    }
}

impl Default for GaussKronrodRule {
    fn default() -> Self {
        GaussKronrodRule::new(GaussKronrodPair::G7K15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const PAIRS: [GaussKronrodPair; 3] = [
        GaussKronrodPair::G3K7,
        GaussKronrodPair::G7K15,
        GaussKronrodPair::G15K31,
    ];

    #[test]
    fn test_table_shapes() {
        for pair in PAIRS {
            let rule = GaussKronrodRule::new(pair);
            assert_eq!(rule.other_kronrod_nodes().len(), rule.order());
            assert_eq!(rule.other_kronrod_weights().len(), rule.order());
            assert_eq!(rule.other_gauss_weights().len(), (rule.order() - 1) / 2);
            assert_eq!(rule.npoints(), 2 * rule.order() + 1);
        }
    }

    #[test]
    fn test_nodes_increasing_in_unit_interval() {
        for pair in PAIRS {
            let rule = GaussKronrodRule::new(pair);
            let nodes = rule.other_kronrod_nodes();
            for w in nodes.windows(2) {
                assert!(w[0] < w[1]);
            }
            assert!(nodes[0] > 0.);
            assert!(nodes[nodes.len() - 1] < 1.);
        }
    }

    #[test]
    fn test_weights_sum_to_interval_length() {
        // Both rules integrate the constant 1 exactly over [-1, 1]
        for pair in PAIRS {
            let rule = GaussKronrodRule::new(pair);
            let kronrod_sum = rule.zero_kronrod_weight()
                + 2. * rule.other_kronrod_weights().iter().sum::<f64>();
            assert_abs_diff_eq!(kronrod_sum, 2., epsilon = 1e-14);
            let gauss_sum =
                rule.zero_gauss_weight() + 2. * rule.other_gauss_weights().iter().sum::<f64>();
            assert_abs_diff_eq!(gauss_sum, 2., epsilon = 1e-14);
        }
    }

    #[test]
    fn test_embedded_gauss_rule_exactness() {
        // The embedded Gauss rule of order m is exact for monomials up to
        // degree 2m - 1; check x^2 and x^4 against their [-1, 1] integrals.
        for pair in PAIRS {
            let rule = GaussKronrodRule::new(pair);
            for (degree, exact) in [(2, 2. / 3.), (4, 2. / 5.)] {
                let mut sum = 0.;
                for (g, w) in rule.other_gauss_weights().iter().enumerate() {
                    let x = rule.other_kronrod_nodes()[2 * g + 1];
                    sum += 2. * w * x.powi(degree);
                }
                assert_abs_diff_eq!(sum, exact, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_gauss3_nodes_are_analytic() {
        let rule = GaussKronrodRule::new(GaussKronrodPair::G3K7);
        assert_abs_diff_eq!(
            rule.other_kronrod_nodes()[1],
            (3f64 / 5.).sqrt(),
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(rule.zero_gauss_weight(), 8. / 9., epsilon = 1e-15);
        assert_abs_diff_eq!(rule.other_gauss_weights()[0], 5. / 9., epsilon = 1e-15);
    }
}
