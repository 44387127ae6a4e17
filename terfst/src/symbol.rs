//! シンボル表の実装モジュール
//!
//! このモジュールは、トークン文字列と非負整数IDの間の全単射を提供します。
//! ID 0は常にイプシロン（[`EPSILON_SYMBOL`]）に予約されており、
//! FSTカーネルの空遷移ラベルと一致します。

use crate::common::EPSILON_SYMBOL;
use crate::fst::Label;

use hashbrown::HashMap;

/// トークン文字列と整数IDの全単射を保持するシンボル表
///
/// 不変条件:
/// - ID 0は`<epsilon>`に予約される
/// - [`add_symbol`](Self::add_symbol)は冪等であり、登録済みのシンボルには
///   既存のIDを返す
/// - 双方向の検索（文字列→ID、ID→文字列）が可能
#[derive(Debug, Clone)]
pub struct SymbolTable {
    syms: Vec<String>,
    ids: HashMap<String, Label>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// イプシロンのみを含む新しいシンボル表を生成します。
    ///
    /// # 戻り値
    ///
    /// ID 0に`<epsilon>`が登録されたシンボル表
    pub fn new() -> Self {
        let mut table = Self {
            syms: Vec::new(),
            ids: HashMap::new(),
        };
        table.add_symbol(EPSILON_SYMBOL);
        table
    }

    /// シンボルを登録し、そのIDを返します。
    ///
    /// 既に登録されているシンボルの場合、新しいIDを割り当てずに
    /// 既存のIDを返します。
    ///
    /// # 引数
    ///
    /// * `sym` - 登録するシンボル文字列
    ///
    /// # 戻り値
    ///
    /// シンボルのID
    pub fn add_symbol<S>(&mut self, sym: S) -> Label
    where
        S: AsRef<str>,
    {
        let sym = sym.as_ref();
        if let Some(&id) = self.ids.get(sym) {
            return id;
        }
        let id = Label::try_from(self.syms.len()).unwrap();
        self.syms.push(sym.to_string());
        self.ids.insert(sym.to_string(), id);
        id
    }

    /// シンボル文字列からIDを検索します。
    ///
    /// # 引数
    ///
    /// * `sym` - 検索するシンボル文字列
    ///
    /// # 戻り値
    ///
    /// 登録されている場合は`Some(ID)`、未登録の場合は`None`
    #[inline]
    pub fn find(&self, sym: &str) -> Option<Label> {
        self.ids.get(sym).copied()
    }

    /// IDからシンボル文字列を検索します。
    ///
    /// # 引数
    ///
    /// * `id` - 検索するID
    ///
    /// # 戻り値
    ///
    /// 登録されている場合は`Some(文字列)`、範囲外の場合は`None`
    #[inline]
    pub fn symbol(&self, id: Label) -> Option<&str> {
        self.syms.get(id as usize).map(String::as_str)
    }

    /// 登録されているシンボル数を返します（イプシロンを含む）。
    #[inline]
    pub fn len(&self) -> usize {
        self.syms.len()
    }

    /// シンボル表が空かどうかを返します。
    ///
    /// イプシロンは常に登録されているため、この関数は`false`を返します。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsilon_reserved() {
        let table = SymbolTable::new();
        assert_eq!(table.find(EPSILON_SYMBOL), Some(0));
        assert_eq!(table.symbol(0), Some(EPSILON_SYMBOL));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_add_symbol_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.add_symbol("HEY");
        let b = table.add_symbol("HERE");
        assert_eq!(table.add_symbol("HEY"), a);
        assert_eq!(table.add_symbol("HERE"), b);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_bidirectional_lookup() {
        let mut table = SymbolTable::new();
        let id = table.add_symbol("I'M");
        assert_eq!(table.find("I'M"), Some(id));
        assert_eq!(table.symbol(id), Some("I'M"));
        assert_eq!(table.find("I'm"), None);
        assert_eq!(table.symbol(99), None);
    }
}
