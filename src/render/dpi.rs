// レンダリングDPIの上限: 大判ページでの画素数爆発を防ぐ

/// 1ページあたりの既定の画素数上限。
pub const DEFAULT_PIXEL_CEILING: u64 = 5_000_000;

/// 上限適用後の最低DPI。
pub const DEFAULT_MIN_DPI: u32 = 72;

/// 予測画素数が `pixel_ceiling` を超えないようにDPIを下げる。
///
/// 予測画素数 = (w/72·dpi)·(h/72·dpi)。超える場合は `sqrt(ceiling / projected)`
/// 倍に縮め、`min_dpi` を下限とする。寸法が不正（非有限・0以下）なら
/// `target_dpi` をそのまま返す。
pub fn cap_dpi(
    width_pt: f64,
    height_pt: f64,
    target_dpi: u32,
    pixel_ceiling: u64,
    min_dpi: u32,
) -> u32 {
    if !width_pt.is_finite() || !height_pt.is_finite() || width_pt <= 0.0 || height_pt <= 0.0 {
        return target_dpi;
    }

    let dpi = target_dpi as f64;
    let projected = (width_pt / 72.0 * dpi) * (height_pt / 72.0 * dpi);
    if projected <= pixel_ceiling as f64 {
        return target_dpi;
    }

    let scaled = (dpi * (pixel_ceiling as f64 / projected).sqrt()).floor();
    (scaled as u32).max(min_dpi)
}

/// ページ寸法の取得結果に対して [`cap_dpi`] を適用する。取得失敗時は目標DPIのまま。
pub fn cap_dpi_for<E>(
    dimensions: Result<(f64, f64), E>,
    target_dpi: u32,
    pixel_ceiling: u64,
    min_dpi: u32,
) -> u32 {
    match dimensions {
        Ok((w, h)) => cap_dpi(w, h, target_dpi, pixel_ceiling, min_dpi),
        Err(_) => target_dpi,
    }
}
